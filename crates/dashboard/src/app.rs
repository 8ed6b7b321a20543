use crate::hooks::Hooks;
use crate::pages::{
    LogsPage, OrdersPage, OverviewPage, Page, PortfolioPage, RiskPage, SignalsPage, StrategiesPage,
};
use configuration::{ConsoleConfig, PageId};
use core_types::{EngineStatus, LogFilter, ServerTime};
use query_cache::Subscription;
use status::{ConnectionStatus, derive_mode};
use std::time::Duration;

/// How often [`Dashboard::wait_until_settled`] re-checks the pages.
const SETTLE_POLL: Duration = Duration::from_millis(50);

/// The whole console: a header fed by always-on queries plus every page,
/// of which only the active one polls.
pub struct Dashboard {
    heartbeat: Subscription<ServerTime>,
    engines: Subscription<Vec<EngineStatus>>,
    pages: Vec<Box<dyn Page>>,
    active: PageId,
}

impl Dashboard {
    /// Mounts every page. Queries of pages other than `active` are
    /// registered but paused.
    pub fn mount(hooks: &Hooks, console: &ConsoleConfig, active: PageId, tail_engine: Option<String>) -> Self {
        let on = |page: PageId| page == active;

        let pages: Vec<Box<dyn Page>> = vec![
            Box::new(OverviewPage::mount(hooks, on(PageId::Overview))),
            Box::new(OrdersPage::mount(hooks, console.orders_limit, on(PageId::Orders))),
            Box::new(PortfolioPage::mount(hooks, on(PageId::Portfolio))),
            Box::new(SignalsPage::mount(hooks, console.signals_limit, on(PageId::Signals))),
            Box::new(StrategiesPage::mount(hooks, console.stats_days, on(PageId::Strategies))),
            Box::new(RiskPage::mount(hooks, on(PageId::Risk))),
            Box::new(LogsPage::mount(
                hooks,
                LogFilter::with_limit(console.logs_limit),
                tail_engine,
                on(PageId::Logs),
            )),
        ];

        tracing::debug!(page = ?active, "Dashboard mounted.");
        Self {
            heartbeat: hooks.system_time(true),
            engines: hooks.engines(true),
            pages,
            active,
        }
    }

    pub fn active(&self) -> PageId {
        self.active
    }

    pub fn set_page(&mut self, page: PageId) {
        if page == self.active {
            return;
        }
        if let Some(current) = self.page(self.active) {
            current.set_active(false);
        }
        if let Some(next) = self.page(page) {
            next.set_active(true);
        }
        tracing::debug!(from = ?self.active, to = ?page, "Switched page.");
        self.active = page;
    }

    pub fn next_page(&mut self) {
        self.set_page(self.active.next());
    }

    fn page(&self, id: PageId) -> Option<&dyn Page> {
        self.pages.iter().find(|page| page.id() == id).map(Box::as_ref)
    }

    /// The header and the active page have all resolved to data or errors.
    pub fn is_settled(&self) -> bool {
        !self.heartbeat.snapshot().is_loading
            && !self.engines.snapshot().is_loading
            && self.page(self.active).is_none_or(|page| page.is_settled())
    }

    /// Waits until [`is_settled`](Self::is_settled) or `timeout`; returns
    /// whether the dashboard settled.
    pub async fn wait_until_settled(&self, timeout: Duration) -> bool {
        let settled = async {
            while !self.is_settled() {
                tokio::time::sleep(SETTLE_POLL).await;
            }
        };
        tokio::time::timeout(timeout, settled).await.is_ok()
    }

    pub fn render_header(&self, now_ms: i64) -> String {
        let connection = ConnectionStatus::from_snapshot(&self.heartbeat.snapshot(), now_ms);
        let engines = self.engines.snapshot();
        let mode = derive_mode(engines.data.as_deref().map(Vec::as_slice));

        let tabs = self
            .pages
            .iter()
            .map(|page| {
                if page.id() == self.active {
                    format!("[{}]", page.title())
                } else {
                    page.title().to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("  ");

        format!(
            "WATCHTOWER | mode: {} | {} | last update: {}\n{}\n",
            mode,
            connection.label(),
            crate::widgets::elapsed(connection.time_since_update),
            tabs,
        )
    }

    /// Header followed by the active page.
    pub fn render(&self, now_ms: i64) -> String {
        let body = self
            .page(self.active)
            .map(|page| page.render(now_ms))
            .unwrap_or_default();
        format!("{}\n{}", self.render_header(now_ms), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::HttpApiClient;
    use configuration::{ApiConfig, CacheConfig, PollingConfig};
    use httpmock::Mock;
    use httpmock::prelude::*;
    use query_cache::{QueryCache, SystemClock};
    use serde_json::json;
    use std::sync::Arc;

    fn hooks(server: &MockServer) -> Hooks {
        let client = HttpApiClient::new(&ApiConfig {
            base_url: server.base_url(),
        })
        .unwrap();
        let cache = QueryCache::new(
            CacheConfig {
                retry: 0,
                ..Default::default()
            },
            Arc::new(SystemClock),
        );
        Hooks::new(cache, Arc::new(client), PollingConfig::default())
    }

    async fn header_mocks(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/system/time");
                then.status(200).json_body(json!({"utc": "2024-05-01T10:00:00Z"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/engines/status");
                then.status(200).json_body(json!([
                    {"name": "alpha", "running": true, "mode": "paper"}
                ]));
            })
            .await;
    }

    async fn orders_mock(server: &MockServer) -> Mock<'_> {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/recent");
                then.status(200).json_body(json!({"orders": [
                    {"id": 1, "symbol": "ETHUSDT", "side": "BUY", "qty": "1", "status": "OPEN",
                     "created_at": "2024-05-01T09:59:00Z"},
                    {"id": 2, "symbol": "SOLUSDT", "side": "SELL", "qty": "3", "status": "FILLED",
                     "created_at": "2024-05-01T09:58:00Z"}
                ]}));
            })
            .await
    }

    #[tokio::test]
    async fn renders_header_and_active_page() {
        let server = MockServer::start_async().await;
        header_mocks(&server).await;
        orders_mock(&server).await;

        let hooks = hooks(&server);
        let dashboard = Dashboard::mount(&hooks, &ConsoleConfig::default(), PageId::Orders, None);
        assert!(dashboard.wait_until_settled(Duration::from_secs(5)).await);

        let out = dashboard.render(hooks.cache().now_ms());
        assert!(out.contains("mode: PAPER"));
        assert!(out.contains("| CONNECTED |"));
        assert!(out.contains("[Orders]"));
        let active = out.find("Active orders").unwrap();
        let completed = out.find("Completed orders").unwrap();
        let eth = out.find("ETHUSDT").unwrap();
        let sol = out.find("SOLUSDT").unwrap();
        assert!(active < eth && eth < completed && completed < sol);
    }

    #[tokio::test]
    async fn inactive_pages_do_not_poll() {
        let server = MockServer::start_async().await;
        header_mocks(&server).await;
        let orders = orders_mock(&server).await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/risk/limits");
                then.status(200).json_body(json!({"max_leverage": 2.0}));
            })
            .await;

        let hooks = hooks(&server);
        let mut dashboard = Dashboard::mount(&hooks, &ConsoleConfig::default(), PageId::Risk, None);
        dashboard.wait_until_settled(Duration::from_secs(5)).await;
        assert_eq!(orders.hits_async().await, 0);

        dashboard.set_page(PageId::Orders);
        assert!(dashboard.wait_until_settled(Duration::from_secs(5)).await);
        assert_eq!(orders.hits_async().await, 1);
    }

    #[tokio::test]
    async fn backend_errors_render_inline() {
        let server = MockServer::start_async().await;
        header_mocks(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/risk/limits");
                then.status(503).json_body(json!({"detail": "risk engine offline"}));
            })
            .await;

        let hooks = hooks(&server);
        let dashboard = Dashboard::mount(&hooks, &ConsoleConfig::default(), PageId::Risk, None);
        assert!(dashboard.wait_until_settled(Duration::from_secs(5)).await);

        let out = dashboard.render(hooks.cache().now_ms());
        assert!(out.contains("Failed to load risk limits"));
        assert!(out.contains("503"));
    }

    #[tokio::test]
    async fn next_page_wraps_around() {
        let server = MockServer::start_async().await;
        let hooks = hooks(&server);
        let mut dashboard = Dashboard::mount(&hooks, &ConsoleConfig::default(), PageId::Logs, None);

        dashboard.next_page();
        assert_eq!(dashboard.active(), PageId::Overview);
        dashboard.next_page();
        assert_eq!(dashboard.active(), PageId::Orders);
    }
}
