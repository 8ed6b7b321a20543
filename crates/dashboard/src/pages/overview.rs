use crate::hooks::Hooks;
use crate::pages::{Page, Query, all_settled, set_all};
use crate::view_state::ViewState;
use crate::widgets;
use comfy_table::{Cell, Color};
use configuration::PageId;
use core_types::{AuthStatus, EngineStatus, PortfolioSummary, ServerTime, ServiceMeta};
use query_cache::Subscription;
use status::{ConnectionStatus, derive_mode};

/// Service identity, derived status, the portfolio summary card and the
/// engines table.
pub struct OverviewPage {
    meta: Subscription<ServiceMeta>,
    auth: Subscription<AuthStatus>,
    heartbeat: Subscription<ServerTime>,
    engines: Subscription<Vec<EngineStatus>>,
    summary: Subscription<PortfolioSummary>,
}

impl OverviewPage {
    pub fn mount(hooks: &Hooks, active: bool) -> Self {
        Self {
            meta: hooks.meta(active),
            auth: hooks.auth_status(active),
            heartbeat: hooks.system_time(active),
            engines: hooks.engines(active),
            summary: hooks.portfolio_summary(active),
        }
    }

    fn queries(&self) -> [&dyn Query; 5] {
        [
            &self.meta,
            &self.auth,
            &self.heartbeat,
            &self.engines,
            &self.summary,
        ]
    }

    fn render_service(&self, now_ms: i64) -> String {
        let meta = self.meta.snapshot();
        let auth = self.auth.snapshot();
        let heartbeat = self.heartbeat.snapshot();
        let engines = self.engines.snapshot();

        let connection = ConnectionStatus::from_snapshot(&heartbeat, now_ms);
        let mode = derive_mode(engines.data.as_deref().map(Vec::as_slice));

        let (name, version, environment) = match meta.data.as_deref() {
            Some(meta) => (
                meta.name.clone(),
                meta.version.clone(),
                widgets::opt(meta.environment.as_deref()),
            ),
            None => (
                widgets::PLACEHOLDER.to_string(),
                widgets::PLACEHOLDER.to_string(),
                widgets::PLACEHOLDER.to_string(),
            ),
        };
        let user = match auth.data.as_deref() {
            Some(AuthStatus {
                authenticated: true,
                user,
            }) => widgets::opt(user.as_deref()),
            Some(_) => "not authenticated".to_string(),
            None => widgets::PLACEHOLDER.to_string(),
        };
        let server_time = widgets::timestamp(heartbeat.data.as_deref().map(|t| t.utc));

        let connection_cell = Cell::new(connection.label()).fg(if connection.is_connected {
            Color::Green
        } else {
            Color::Red
        });

        widgets::card(vec![
            ("Service", Cell::new(name)),
            ("Version", Cell::new(version)),
            ("Environment", Cell::new(environment)),
            ("User", Cell::new(user)),
            ("Mode", Cell::new(mode)),
            ("Connection", connection_cell),
            ("Server time", Cell::new(server_time)),
            ("Last heartbeat", Cell::new(widgets::elapsed(connection.time_since_update))),
        ])
        .to_string()
    }
}

impl Page for OverviewPage {
    fn id(&self) -> PageId {
        PageId::Overview
    }

    fn title(&self) -> &'static str {
        "Overview"
    }

    fn set_active(&self, active: bool) {
        set_all(&self.queries(), active);
    }

    fn is_settled(&self) -> bool {
        all_settled(&self.queries())
    }

    fn render(&self, now_ms: i64) -> String {
        let summary = widgets::render_view(
            ViewState::from_snapshot(&self.summary.snapshot()),
            "portfolio summary",
            render_summary,
        );
        let engines = widgets::render_view(
            ViewState::from_list(&self.engines.snapshot()),
            "engines",
            |engines| render_engines(engines),
        );

        format!(
            "{}\n{}\n{}",
            widgets::section("Service", &self.render_service(now_ms)),
            widgets::section("Portfolio", &summary),
            widgets::section("Engines", &engines),
        )
    }
}

pub fn render_summary(summary: &PortfolioSummary) -> String {
    widgets::card(vec![
        ("Equity", Cell::new(widgets::money(summary.equity))),
        ("Cash", Cell::new(widgets::money(summary.cash))),
        ("Unrealized PnL", widgets::pnl(summary.unrealized_pnl)),
        ("Realized PnL", widgets::pnl(summary.realized_pnl)),
        ("Open positions", Cell::new(summary.open_positions)),
    ])
    .to_string()
}

pub fn render_engines(engines: &[EngineStatus]) -> String {
    let mut table = widgets::table(vec!["Engine", "Running", "Mode"]);
    for engine in engines {
        table.add_row(vec![
            Cell::new(&engine.name),
            Cell::new(widgets::yes_no(engine.running)),
            Cell::new(&engine.mode),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::EngineMode;
    use rust_decimal_macros::dec;

    #[test]
    fn summary_card_lists_equity_and_positions() {
        let out = render_summary(&PortfolioSummary {
            equity: dec!(10500),
            cash: dec!(2500.5),
            unrealized_pnl: dec!(-12.3),
            realized_pnl: dec!(40),
            open_positions: 3,
        });
        assert!(out.contains("10500.00"));
        assert!(out.contains("2500.50"));
        assert!(out.contains("-12.30"));
        assert!(out.contains("Open positions"));
    }

    #[test]
    fn engines_table_shows_unknown_mode_as_dash() {
        let out = render_engines(&[
            EngineStatus {
                name: "alpha".to_string(),
                running: true,
                mode: EngineMode::Live,
            },
            EngineStatus {
                name: "beta".to_string(),
                running: false,
                mode: EngineMode::Unknown,
            },
        ]);
        assert!(out.contains("alpha"));
        assert!(out.contains("LIVE"));
        assert!(out.contains(" - "));
    }
}
