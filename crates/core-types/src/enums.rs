use crate::error::CoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Reads an optional string field, treating `null` the same as an absent field.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Upper-cases and folds `-`/space separators into `_` so `partially filled`,
/// `Partially-Filled` and `PARTIALLY_FILLED` compare equal.
fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    #[serde(rename = "BUY", alias = "buy", alias = "Buy", alias = "LONG", alias = "long")]
    Buy,
    #[serde(rename = "SELL", alias = "sell", alias = "Sell", alias = "SHORT", alias = "short")]
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// The trading mode an engine reports. The backend sends free-form, mixed-case
/// strings and sometimes omits the field entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineMode {
    Live,
    Paper,
    /// A mode string the console does not recognize, kept verbatim for display.
    Other(String),
    /// The field was absent, null or blank.
    #[default]
    Unknown,
}

impl EngineMode {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            EngineMode::Unknown
        } else if trimmed.eq_ignore_ascii_case("live") {
            EngineMode::Live
        } else if trimmed.eq_ignore_ascii_case("paper") {
            EngineMode::Paper
        } else {
            EngineMode::Other(trimmed.to_string())
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMode::Live => write!(f, "LIVE"),
            EngineMode::Paper => write!(f, "PAPER"),
            EngineMode::Other(raw) => write!(f, "{}", raw),
            EngineMode::Unknown => write!(f, "-"),
        }
    }
}

impl<'de> Deserialize<'de> for EngineMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_string(deserializer).map(|raw| EngineMode::parse(&raw))
    }
}

impl Serialize for EngineMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EngineMode::Unknown => serializer.serialize_none(),
            other => serializer.collect_str(other),
        }
    }
}

/// Lifecycle status of an order as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    Open,
    Pending,
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    Other(String),
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "NEW" => OrderStatus::New,
            "OPEN" => OrderStatus::Open,
            "PENDING" => OrderStatus::Pending,
            "ACCEPTED" => OrderStatus::Accepted,
            "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
            "FILLED" => OrderStatus::Filled,
            "CANCELED" | "CANCELLED" => OrderStatus::Canceled,
            "REJECTED" => OrderStatus::Rejected,
            "EXPIRED" => OrderStatus::Expired,
            _ => OrderStatus::Other(raw.trim().to_string()),
        }
    }

    /// Orders still working on the venue.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::New
                | OrderStatus::Open
                | OrderStatus::Pending
                | OrderStatus::Accepted
                | OrderStatus::PartiallyFilled
        )
    }

    /// Orders that reached a terminal state.
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::New => "NEW",
            OrderStatus::Open => "OPEN",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::Other(raw) => raw,
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_string(deserializer).map(|raw| OrderStatus::parse(&raw))
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Severity of a backend log line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Critical,
    Other(String),
}

impl LogLevel {
    pub fn is_problem(&self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error | LogLevel::Critical)
    }

    fn lenient(raw: &str) -> Self {
        raw.parse()
            .unwrap_or_else(|_| LogLevel::Other(raw.trim().to_string()))
    }
}

/// Strict parsing, used for user input such as CLI filters.
impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "DEBUG" | "TRACE" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(CoreError::InvalidInput("log level".to_string(), s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Other(raw) => raw,
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient_string(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(LogLevel::default());
        }
        Ok(LogLevel::lenient(&raw))
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
