//! # Watchtower Status
//!
//! Aggregate states the console shows in its header, derived from cached
//! query entries.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** Nothing here performs I/O or holds state. Both the
//!   connection status and the trading mode are recomputed from their source
//!   entries on every render and are never stored.
//! - **Injected Time:** Callers pass "now" explicitly, so every rule can be
//!   tested at exact instants.

pub mod connection;
pub mod mode;

pub use connection::{ConnectionStatus, DISCONNECT_AFTER};
pub use mode::{TradingMode, derive_mode};
