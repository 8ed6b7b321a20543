use crate::hooks::Hooks;
use crate::pages::{Page, Query, all_settled, set_all};
use crate::view_state::ViewState;
use crate::widgets;
use comfy_table::{Cell, Color};
use configuration::PageId;
use core_types::RiskLimits;
use query_cache::Subscription;

pub struct RiskPage {
    limits: Subscription<RiskLimits>,
}

impl RiskPage {
    pub fn mount(hooks: &Hooks, active: bool) -> Self {
        Self {
            limits: hooks.risk_limits(active),
        }
    }
}

impl Page for RiskPage {
    fn id(&self) -> PageId {
        PageId::Risk
    }

    fn title(&self) -> &'static str {
        "Risk"
    }

    fn set_active(&self, active: bool) {
        set_all(&[&self.limits as &dyn Query], active);
    }

    fn is_settled(&self) -> bool {
        all_settled(&[&self.limits as &dyn Query])
    }

    fn render(&self, _now_ms: i64) -> String {
        let state = ViewState::from_snapshot(&self.limits.snapshot());
        widgets::render_view(state, "risk limits", render_limits)
    }
}

pub fn render_limits(limits: &RiskLimits) -> String {
    let trading = if limits.trading_halted {
        Cell::new("HALTED").fg(Color::Red)
    } else {
        Cell::new("ACTIVE").fg(Color::Green)
    };

    widgets::card(vec![
        ("Trading", trading),
        ("Max position size", Cell::new(widgets::opt(limits.max_position_size))),
        ("Max daily loss", Cell::new(widgets::opt(limits.max_daily_loss))),
        (
            "Max drawdown",
            Cell::new(widgets::opt(limits.max_drawdown_pct.map(|pct| format!("{}%", pct)))),
        ),
        ("Max open orders", Cell::new(widgets::opt(limits.max_open_orders))),
        ("Max leverage", Cell::new(widgets::opt(limits.max_leverage.map(|x| format!("{}x", x))))),
    ])
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_limits_show_placeholders() {
        let out = render_limits(&RiskLimits {
            max_daily_loss: Some(500.0),
            max_leverage: Some(3.0),
            trading_halted: true,
            ..Default::default()
        });
        assert!(out.contains("HALTED"));
        assert!(out.contains("500"));
        assert!(out.contains("3x"));
        assert!(out.contains("Max open orders"));
    }
}
