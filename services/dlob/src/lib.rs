//! DLOB server
//!
//! Read-only market-data service that reconstructs the decentralized limit
//! order book of an on-chain derivatives exchange and serves it over HTTP.
//!
//! # Architecture
//!
//! ```text
//! AccountStream ──► OrderIndex ──► BookBuilder ──► L2/L3 Aggregator ──► HTTP
//!                                      ▲                  ▲
//!       SlotSource ────────────────────┤                  │
//!       OracleView ────────────────────┘    vAMM / venue fallbacks
//! ```
//!
//! The book is rebuilt wholesale on a fixed tick and published atomically;
//! HTTP handlers only ever read one published snapshot. All state is
//! in-memory and rebuilt from scratch by the supervisor after any crash.

pub mod aggregator;
pub mod codec;
pub mod config;
pub mod engine;
pub mod http;
pub mod markets;
pub mod metrics;
pub mod oracle_map;
pub mod order_index;
pub mod provider;
pub mod rpc;
pub mod slot;
pub mod supervisor;
pub mod user_stats;
pub mod vamm;
pub mod venues;

// Library version constant
pub const SERVICE_VERSION: &str = "0.1.0";
