use crate::hooks::Hooks;
use crate::pages::{Page, Query, all_settled, set_all};
use crate::view_state::ViewState;
use crate::widgets;
use comfy_table::Cell;
use configuration::PageId;
use core_types::Signal;
use query_cache::Subscription;
use std::cmp::Reverse;

pub struct SignalsPage {
    signals: Subscription<Vec<Signal>>,
}

impl SignalsPage {
    pub fn mount(hooks: &Hooks, limit: u32, active: bool) -> Self {
        Self {
            signals: hooks.signals(limit, active),
        }
    }
}

impl Page for SignalsPage {
    fn id(&self) -> PageId {
        PageId::Signals
    }

    fn title(&self) -> &'static str {
        "Signals"
    }

    fn set_active(&self, active: bool) {
        set_all(&[&self.signals as &dyn Query], active);
    }

    fn is_settled(&self) -> bool {
        all_settled(&[&self.signals as &dyn Query])
    }

    fn render(&self, _now_ms: i64) -> String {
        let state = ViewState::from_list(&self.signals.snapshot());
        widgets::render_view(state, "signals", |signals| render_signals(signals))
    }
}

pub fn render_signals(signals: &[Signal]) -> String {
    let mut sorted: Vec<&Signal> = signals.iter().collect();
    sorted.sort_by_key(|signal| Reverse(signal.created_at));

    let mut table = widgets::table(vec!["Time", "Symbol", "Strategy", "Action", "Strength", "Price"]);
    for signal in sorted {
        table.add_row(vec![
            Cell::new(widgets::timestamp(signal.created_at)),
            Cell::new(&signal.symbol),
            Cell::new(&signal.strategy),
            Cell::new(signal.action.to_uppercase()),
            Cell::new(widgets::opt(signal.strength.map(|s| format!("{:.2}", s)))),
            Cell::new(widgets::opt(signal.price.map(widgets::money))),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn signal(symbol: &str, hour: u32) -> Signal {
        Signal {
            id: String::new(),
            symbol: symbol.to_string(),
            strategy: "ma_crossover".to_string(),
            action: "buy".to_string(),
            strength: Some(0.756),
            price: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).single(),
        }
    }

    #[test]
    fn newest_signal_first() {
        let out = render_signals(&[signal("OLDUSDT", 1), signal("NEWUSDT", 9)]);
        assert!(out.find("NEWUSDT").unwrap() < out.find("OLDUSDT").unwrap());
        assert!(out.contains("BUY"));
        assert!(out.contains("0.76"));
    }
}
