use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an absent `watchtower.toml` still yields a
/// usable configuration pointed at a local backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub cache: CacheConfig,
    pub console: ConsoleConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Rejects values that would make the console spin or request nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url must not be empty".to_string(),
            ));
        }

        let intervals = [
            ("polling.heartbeat_ms", self.polling.heartbeat_ms),
            ("polling.engines_ms", self.polling.engines_ms),
            ("polling.meta_ms", self.polling.meta_ms),
            ("polling.auth_ms", self.polling.auth_ms),
            ("polling.portfolio_ms", self.polling.portfolio_ms),
            ("polling.orders_ms", self.polling.orders_ms),
            ("polling.signals_ms", self.polling.signals_ms),
            ("polling.strategy_stats_ms", self.polling.strategy_stats_ms),
            ("polling.strategies_ms", self.polling.strategies_ms),
            ("polling.risk_limits_ms", self.polling.risk_limits_ms),
            ("polling.logs_ms", self.polling.logs_ms),
            ("cache.gc_interval_ms", self.cache.gc_interval_ms),
            ("console.refresh_ms", self.console.refresh_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than 0",
                name
            )));
        }

        let limits = [
            ("console.orders_limit", self.console.orders_limit),
            ("console.signals_limit", self.console.signals_limit),
            ("console.stats_days", self.console.stats_days),
            ("console.logs_limit", self.console.logs_limit),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than 0",
                name
            )));
        }

        Ok(())
    }
}

/// Where the trading backend lives. Every request path is joined under `/api`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

/// Refetch interval of each query, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// The heartbeat (`/api/system/time`) drives the connection indicator.
    pub heartbeat_ms: u64,
    pub engines_ms: u64,
    pub meta_ms: u64,
    pub auth_ms: u64,
    pub portfolio_ms: u64,
    pub orders_ms: u64,
    pub signals_ms: u64,
    pub strategy_stats_ms: u64,
    pub strategies_ms: u64,
    pub risk_limits_ms: u64,
    pub logs_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: 5_000,
            engines_ms: 5_000,
            meta_ms: 60_000,
            auth_ms: 60_000,
            portfolio_ms: 5_000,
            orders_ms: 3_000,
            signals_ms: 5_000,
            strategy_stats_ms: 30_000,
            strategies_ms: 15_000,
            risk_limits_ms: 15_000,
            logs_ms: 5_000,
        }
    }
}

/// Retry and eviction policy of the query cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Extra attempts after a failed fetch, within the same tick.
    pub retry: u32,
    pub retry_delay_ms: u64,
    /// How long an entry without subscribers is kept before eviction.
    pub gc_time_ms: u64,
    pub gc_interval_ms: u64,
}

impl CacheConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retry: 1,
            retry_delay_ms: 1_000,
            gc_time_ms: 300_000,
            gc_interval_ms: 60_000,
        }
    }
}

/// The pages the console can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum PageId {
    #[default]
    Overview,
    Orders,
    Portfolio,
    Signals,
    Strategies,
    Risk,
    Logs,
}

impl PageId {
    /// Display order of the page tabs.
    pub const ALL: [PageId; 7] = [
        PageId::Overview,
        PageId::Orders,
        PageId::Portfolio,
        PageId::Signals,
        PageId::Strategies,
        PageId::Risk,
        PageId::Logs,
    ];

    pub fn next(self) -> PageId {
        let index = Self::ALL.iter().position(|page| *page == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Rendering and request-size settings of the console.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub refresh_ms: u64,
    pub default_page: PageId,
    pub orders_limit: u32,
    pub signals_limit: u32,
    pub stats_days: u32,
    pub logs_limit: u32,
}

impl ConsoleConfig {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 1_000,
            default_page: PageId::Overview,
            orders_limit: 50,
            signals_limit: 50,
            stats_days: 30,
            logs_limit: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    pub directory: String,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: "logs".to_string(),
            file_prefix: "watchtower.log".to_string(),
        }
    }
}
