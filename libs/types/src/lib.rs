//! Types library for the DLOB server
//!
//! Chain-native type definitions shared across the workspace: markets,
//! orders, user accounts, and oracle data, plus the precision constants the
//! on-chain program scales its amounts with.
//!
//! # Modules
//! - `market`: market identity and static market configuration
//! - `numeric`: precision constants and widened integer math helpers
//! - `order`: the on-chain order model
//! - `account`: user and user-stats accounts
//! - `oracle`: per-market oracle price data
//!
//! All monetary fields are fixed-precision integers; floating point is never
//! used for prices or sizes.

pub mod account;
pub mod market;
pub mod numeric;
pub mod oracle;
pub mod order;

pub use solana_sdk::pubkey::Pubkey;

// Library version constant
pub const LIB_VERSION: &str = "0.1.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::account::*;
    pub use crate::market::*;
    pub use crate::numeric::*;
    pub use crate::oracle::*;
    pub use crate::order::*;
    pub use crate::Pubkey;
}
