use crate::enums::{EngineMode, LogLevel, OrderSide, OrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// Identifiers arrive as either JSON strings or integers depending on the endpoint.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(text)) => text,
        Some(Id::Signed(n)) => n.to_string(),
        Some(Id::Unsigned(n)) => n.to_string(),
        None => String::new(),
    })
}

/// `GET /api/meta`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, alias = "env")]
    pub environment: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// `GET /api/auth/status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<String>,
}

/// `GET /api/system/time`, the heartbeat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTime {
    pub utc: DateTime<Utc>,
}

/// One entry of `GET /api/engines/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub name: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub mode: EngineMode,
}

/// A single open position, embedded in the portfolio document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    #[serde(default)]
    pub side: Option<OrderSide>,
    #[serde(default, alias = "qty")]
    pub quantity: Decimal,
    #[serde(default, alias = "entry_price")]
    pub avg_price: Decimal,
    #[serde(default, alias = "mark_price")]
    pub market_price: Option<Decimal>,
    #[serde(default)]
    pub unrealized_pnl: Decimal,
}

/// `GET /api/portfolio`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default)]
    pub equity: Decimal,
    #[serde(default)]
    pub cash: Decimal,
    #[serde(default)]
    pub unrealized_pnl: Decimal,
    #[serde(default)]
    pub realized_pnl: Decimal,
    #[serde(default)]
    pub daily_pnl: Option<Decimal>,
    #[serde(default)]
    pub positions: Vec<Position>,
}

/// `GET /api/portfolio/summary`. Overlaps with [`Portfolio`] but is served by a
/// separate handler, so the two may briefly disagree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    #[serde(default)]
    pub equity: Decimal,
    #[serde(default)]
    pub cash: Decimal,
    #[serde(default)]
    pub unrealized_pnl: Decimal,
    #[serde(default)]
    pub realized_pnl: Decimal,
    #[serde(default, alias = "positions_count")]
    pub open_positions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub side: Option<OrderSide>,
    #[serde(default, alias = "qty")]
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, alias = "filled_qty")]
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default, alias = "ts")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `GET /api/orders/recent`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// One entry of `GET /api/signals/recent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub strategy: String,
    #[serde(default, alias = "side", alias = "direction")]
    pub action: String,
    #[serde(default)]
    pub strength: Option<f64>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, alias = "ts")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One entry of `GET /api/stats/strategies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub strategy: String,
    #[serde(default)]
    pub trades: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub pnl: Decimal,
}

/// A strategy's configuration as returned by the strategy endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDetail {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `POST /api/strategies/{id}/params`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategyParamsUpdate {
    pub params: Map<String, Value>,
}

/// `GET /api/risk/limits`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    #[serde(default)]
    pub max_position_size: Option<f64>,
    #[serde(default)]
    pub max_daily_loss: Option<f64>,
    #[serde(default)]
    pub max_drawdown_pct: Option<f64>,
    #[serde(default)]
    pub max_open_orders: Option<u32>,
    #[serde(default)]
    pub max_leverage: Option<f64>,
    #[serde(default)]
    pub trading_halted: bool,
}

/// Partial update for `POST /api/risk/limits`. Fields left as `None` are not
/// sent, so the backend keeps its current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskLimitsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_position_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_daily_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_drawdown_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_open_orders: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_leverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trading_halted: Option<bool>,
}

impl RiskLimitsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Query parameters of `GET /api/logs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LogFilter {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl LogFilter {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            level: None,
            contains: None,
            kind: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, alias = "ts", alias = "time")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default, alias = "msg")]
    pub message: String,
}

/// `GET /api/logs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default, alias = "items")]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// `GET /api/logs/tail`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLogsTailResponse {
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn engine_status_without_mode_is_unknown() {
        let engines: Vec<EngineStatus> = serde_json::from_value(json!([
            {"name": "alpha", "running": true},
            {"name": "beta", "running": false, "mode": "Paper"}
        ]))
        .unwrap();
        assert_eq!(engines[0].mode, EngineMode::Unknown);
        assert_eq!(engines[1].mode, EngineMode::Paper);
    }

    #[test]
    fn order_accepts_numeric_ids_and_float_prices() {
        let order: Order = serde_json::from_value(json!({
            "id": 42,
            "symbol": "BTCUSDT",
            "side": "buy",
            "qty": 0.5,
            "price": 65000.25,
            "status": "open"
        }))
        .unwrap();
        assert_eq!(order.id, "42");
        assert_eq!(order.side, Some(OrderSide::Buy));
        assert_eq!(order.quantity, dec!(0.5));
        assert_eq!(order.price, Some(dec!(65000.25)));
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.filled_quantity, dec!(0));
    }

    #[test]
    fn order_with_only_a_status_decodes() {
        let response: OrdersResponse =
            serde_json::from_str(r#"{"orders":[{"status":"OPEN"},{"status":"FILLED"}]}"#).unwrap();
        assert_eq!(response.orders.len(), 2);
        assert_eq!(response.orders[0].id, "");
        assert_eq!(response.orders[0].side, None);
        assert_eq!(response.orders[1].status, OrderStatus::Filled);
    }

    #[test]
    fn portfolio_defaults_missing_fields() {
        let portfolio: Portfolio = serde_json::from_value(json!({"equity": "1000.5"})).unwrap();
        assert_eq!(portfolio.equity, dec!(1000.5));
        assert!(portfolio.positions.is_empty());
        assert_eq!(portfolio.daily_pnl, None);
    }

    #[test]
    fn risk_update_omits_unset_fields() {
        let update = RiskLimitsUpdate {
            max_daily_loss: Some(250.0),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"max_daily_loss": 250.0}));
        assert!(!update.is_empty());
        assert!(RiskLimitsUpdate::default().is_empty());
    }

    #[test]
    fn server_time_requires_iso_timestamp() {
        let time: ServerTime = serde_json::from_value(json!({"utc": "2024-01-01T00:00:00Z"})).unwrap();
        assert_eq!(time.utc.timestamp(), 1_704_067_200);
        assert!(serde_json::from_value::<ServerTime>(json!({"utc": "yesterday"})).is_err());
    }
}
