use crate::hooks::Hooks;
use crate::pages::{Page, Query, all_settled, set_all};
use crate::view_state::ViewState;
use crate::widgets;
use comfy_table::{Cell, Color};
use configuration::PageId;
use core_types::{StrategyDetail, StrategyStats};
use query_cache::Subscription;
use serde_json::Value;

pub struct StrategiesPage {
    stats: Subscription<Vec<StrategyStats>>,
    strategies: Subscription<Vec<StrategyDetail>>,
    days: u32,
}

impl StrategiesPage {
    pub fn mount(hooks: &Hooks, days: u32, active: bool) -> Self {
        Self {
            stats: hooks.strategy_stats(days, active),
            strategies: hooks.strategies(active),
            days,
        }
    }

    fn queries(&self) -> [&dyn Query; 2] {
        [&self.stats, &self.strategies]
    }
}

impl Page for StrategiesPage {
    fn id(&self) -> PageId {
        PageId::Strategies
    }

    fn title(&self) -> &'static str {
        "Strategies"
    }

    fn set_active(&self, active: bool) {
        set_all(&self.queries(), active);
    }

    fn is_settled(&self) -> bool {
        all_settled(&self.queries())
    }

    fn render(&self, _now_ms: i64) -> String {
        let stats = widgets::render_view(
            ViewState::from_list(&self.stats.snapshot()),
            "strategy statistics",
            |stats| render_stats(stats),
        );
        let strategies = widgets::render_view(
            ViewState::from_list(&self.strategies.snapshot()),
            "strategies",
            |strategies| render_strategies(strategies),
        );

        format!(
            "{}\n{}",
            widgets::section(&format!("Performance, last {} days", self.days), &stats),
            widgets::section("Configured strategies", &strategies),
        )
    }
}

/// Per-strategy statistics, best PnL first.
pub fn render_stats(stats: &[StrategyStats]) -> String {
    let mut sorted: Vec<&StrategyStats> = stats.iter().collect();
    sorted.sort_by(|a, b| b.pnl.cmp(&a.pnl));

    let mut table = widgets::table(vec!["Strategy", "Trades", "Wins", "Losses", "Win rate", "PnL"]);
    for row in sorted {
        table.add_row(vec![
            Cell::new(&row.strategy),
            Cell::new(row.trades),
            Cell::new(row.wins),
            Cell::new(row.losses),
            Cell::new(format!("{:.1}%", win_rate_pct(row.win_rate))),
            widgets::pnl(row.pnl),
        ]);
    }
    table.to_string()
}

// The backend reports win rate either as a fraction or as a percentage.
fn win_rate_pct(win_rate: f64) -> f64 {
    if win_rate <= 1.0 { win_rate * 100.0 } else { win_rate }
}

pub fn render_strategies(strategies: &[StrategyDetail]) -> String {
    let mut table = widgets::table(vec!["ID", "Name", "Enabled", "Params"]);
    for strategy in strategies {
        let enabled = Cell::new(widgets::yes_no(strategy.enabled)).fg(if strategy.enabled {
            Color::Green
        } else {
            Color::DarkGrey
        });
        table.add_row(vec![
            Cell::new(&strategy.id),
            Cell::new(&strategy.name),
            enabled,
            Cell::new(format_params(&strategy.params)),
        ]);
    }
    table.to_string()
}

/// `key=value` pairs in key order, strings unquoted.
pub fn format_params(params: &serde_json::Map<String, Value>) -> String {
    let mut pairs: Vec<(&String, &Value)> = params.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => format!("{}={}", key, text),
            other => format!("{}={}", key, other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn stats(name: &str, pnl: rust_decimal::Decimal) -> StrategyStats {
        StrategyStats {
            strategy: name.to_string(),
            trades: 10,
            wins: 6,
            losses: 4,
            win_rate: 0.6,
            pnl,
        }
    }

    #[test]
    fn stats_sorted_by_pnl_descending() {
        let out = render_stats(&[
            stats("loser", dec!(-50)),
            stats("winner", dec!(300)),
            stats("flat", dec!(0)),
        ]);
        let winner = out.find("winner").unwrap();
        let flat = out.find("flat").unwrap();
        let loser = out.find("loser").unwrap();
        assert!(winner < flat && flat < loser);
        assert!(out.contains("60.0%"));
    }

    #[test]
    fn params_render_in_key_order() {
        let params = json!({"window": 20, "symbol": "BTCUSDT", "enabled_short": false});
        let Value::Object(params) = params else {
            unreachable!()
        };
        assert_eq!(
            format_params(&params),
            "enabled_short=false symbol=BTCUSDT window=20"
        );
    }
}
