//! HTTP query surface

pub mod error;
pub mod handlers;
pub mod params;
pub mod rate_limit;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
