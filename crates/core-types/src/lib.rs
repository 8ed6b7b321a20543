//! # Watchtower Core Types
//!
//! The typed shapes of every JSON document the trading backend serves under `/api`.
//!
//! As a Layer 0 crate it has no knowledge of HTTP or caching. Loosely formatted
//! fields (mixed-case modes, order statuses, log levels) are validated into enums
//! here, so format quirks are handled in exactly one place.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{EngineMode, LogLevel, OrderSide, OrderStatus};
pub use error::CoreError;
pub use structs::{
    AuthStatus, EngineLogsTailResponse, EngineStatus, LogEntry, LogFilter, LogsResponse, Order,
    OrdersResponse, Portfolio, PortfolioSummary, Position, RiskLimits, RiskLimitsUpdate,
    ServerTime, ServiceMeta, Signal, StrategyDetail, StrategyParamsUpdate, StrategyStats,
};
