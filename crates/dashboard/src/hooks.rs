use api_client::ApiClient;
use api_client::error::ApiError;
use configuration::PollingConfig;
use core_types::{
    AuthStatus, EngineLogsTailResponse, EngineStatus, LogFilter, LogsResponse, OrdersResponse,
    Portfolio, PortfolioSummary, RiskLimits, RiskLimitsUpdate, ServerTime, ServiceMeta, Signal,
    StrategyDetail, StrategyParamsUpdate, StrategyStats,
};
use query_cache::{QueryCache, QueryKey, QueryOptions, Subscription};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Cache key endpoint names.
pub mod keys {
    pub const META: &str = "meta";
    pub const AUTH_STATUS: &str = "auth/status";
    pub const SYSTEM_TIME: &str = "system/time";
    pub const ENGINES: &str = "engines/status";
    pub const PORTFOLIO: &str = "portfolio";
    pub const PORTFOLIO_SUMMARY: &str = "portfolio/summary";
    pub const ORDERS: &str = "orders/recent";
    pub const SIGNALS: &str = "signals/recent";
    pub const STRATEGY_STATS: &str = "stats/strategies";
    pub const STRATEGIES: &str = "strategies";
    pub const RISK_LIMITS: &str = "risk/limits";
    pub const LOGS: &str = "logs";
    pub const LOGS_TAIL: &str = "logs/tail";
}

/// One constructor per backend query. Each returns a live subscription that
/// polls at the configured interval while enabled. Mutations go through here
/// too, so the views they affect refresh right away.
#[derive(Clone)]
pub struct Hooks {
    cache: QueryCache,
    client: Arc<dyn ApiClient>,
    polling: PollingConfig,
}

impl Hooks {
    pub fn new(cache: QueryCache, client: Arc<dyn ApiClient>, polling: PollingConfig) -> Self {
        Self {
            cache,
            client,
            polling,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn query<T, F, Fut>(&self, key: QueryKey, interval_ms: u64, enabled: bool, fetch: F) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<dyn ApiClient>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        let options = QueryOptions::polling(Duration::from_millis(interval_ms)).enabled(enabled);
        self.cache
            .subscribe(key, move || fetch(Arc::clone(&client)), options)
    }

    /// The heartbeat. Its freshness is the connection indicator.
    pub fn system_time(&self, enabled: bool) -> Subscription<ServerTime> {
        self.query(
            QueryKey::new(keys::SYSTEM_TIME),
            self.polling.heartbeat_ms,
            enabled,
            |client| async move { client.system_time().await },
        )
    }

    pub fn engines(&self, enabled: bool) -> Subscription<Vec<EngineStatus>> {
        self.query(
            QueryKey::new(keys::ENGINES),
            self.polling.engines_ms,
            enabled,
            |client| async move { client.engines_status().await },
        )
    }

    pub fn meta(&self, enabled: bool) -> Subscription<ServiceMeta> {
        self.query(
            QueryKey::new(keys::META),
            self.polling.meta_ms,
            enabled,
            |client| async move { client.meta().await },
        )
    }

    pub fn auth_status(&self, enabled: bool) -> Subscription<AuthStatus> {
        self.query(
            QueryKey::new(keys::AUTH_STATUS),
            self.polling.auth_ms,
            enabled,
            |client| async move { client.auth_status().await },
        )
    }

    pub fn portfolio(&self, enabled: bool) -> Subscription<Portfolio> {
        self.query(
            QueryKey::new(keys::PORTFOLIO),
            self.polling.portfolio_ms,
            enabled,
            |client| async move { client.portfolio().await },
        )
    }

    pub fn portfolio_summary(&self, enabled: bool) -> Subscription<PortfolioSummary> {
        self.query(
            QueryKey::new(keys::PORTFOLIO_SUMMARY),
            self.polling.portfolio_ms,
            enabled,
            |client| async move { client.portfolio_summary().await },
        )
    }

    pub fn orders(&self, limit: u32, enabled: bool) -> Subscription<OrdersResponse> {
        self.query(
            QueryKey::new(keys::ORDERS).param("limit", limit),
            self.polling.orders_ms,
            enabled,
            move |client| async move { client.recent_orders(limit).await },
        )
    }

    pub fn signals(&self, limit: u32, enabled: bool) -> Subscription<Vec<Signal>> {
        self.query(
            QueryKey::new(keys::SIGNALS).param("limit", limit),
            self.polling.signals_ms,
            enabled,
            move |client| async move { client.recent_signals(limit).await },
        )
    }

    pub fn strategy_stats(&self, days: u32, enabled: bool) -> Subscription<Vec<StrategyStats>> {
        self.query(
            QueryKey::new(keys::STRATEGY_STATS).param("days", days),
            self.polling.strategy_stats_ms,
            enabled,
            move |client| async move { client.strategy_stats(days).await },
        )
    }

    pub fn strategies(&self, enabled: bool) -> Subscription<Vec<StrategyDetail>> {
        self.query(
            QueryKey::new(keys::STRATEGIES),
            self.polling.strategies_ms,
            enabled,
            |client| async move { client.strategies().await },
        )
    }

    pub fn risk_limits(&self, enabled: bool) -> Subscription<RiskLimits> {
        self.query(
            QueryKey::new(keys::RISK_LIMITS),
            self.polling.risk_limits_ms,
            enabled,
            |client| async move { client.risk_limits().await },
        )
    }

    pub fn logs(&self, filter: LogFilter, enabled: bool) -> Subscription<LogsResponse> {
        let key = QueryKey::new(keys::LOGS)
            .param("limit", filter.limit)
            .param_opt("level", filter.level.as_deref())
            .param_opt("contains", filter.contains.as_deref())
            .param_opt("kind", filter.kind.as_deref());
        self.query(key, self.polling.logs_ms, enabled, move |client| {
            let filter = filter.clone();
            async move { client.logs(&filter).await }
        })
    }

    pub fn logs_tail(&self, engine: String, lines: u32, enabled: bool) -> Subscription<EngineLogsTailResponse> {
        let key = QueryKey::new(keys::LOGS_TAIL)
            .param("engine", &engine)
            .param("lines", lines);
        self.query(key, self.polling.logs_ms, enabled, move |client| {
            let engine = engine.clone();
            async move { client.logs_tail(&engine, lines).await }
        })
    }

    /// Reads the risk limits once, outside the cache.
    pub async fn fetch_risk_limits(&self) -> Result<RiskLimits, ApiError> {
        self.client.risk_limits().await
    }

    pub async fn fetch_strategies(&self) -> Result<Vec<StrategyDetail>, ApiError> {
        self.client.strategies().await
    }

    pub async fn update_risk_limits(&self, update: &RiskLimitsUpdate) -> Result<RiskLimits, ApiError> {
        let limits = self.client.update_risk_limits(update).await?;
        self.cache.invalidate(keys::RISK_LIMITS);
        Ok(limits)
    }

    pub async fn enable_strategy(&self, id: &str) -> Result<StrategyDetail, ApiError> {
        let detail = self.client.enable_strategy(id).await?;
        self.strategies_changed();
        Ok(detail)
    }

    pub async fn disable_strategy(&self, id: &str) -> Result<StrategyDetail, ApiError> {
        let detail = self.client.disable_strategy(id).await?;
        self.strategies_changed();
        Ok(detail)
    }

    pub async fn update_strategy_params(
        &self,
        id: &str,
        update: &StrategyParamsUpdate,
    ) -> Result<StrategyDetail, ApiError> {
        let detail = self.client.update_strategy_params(id, update).await?;
        self.strategies_changed();
        Ok(detail)
    }

    fn strategies_changed(&self) {
        let refreshed = self.cache.invalidate(keys::STRATEGIES) + self.cache.invalidate(keys::STRATEGY_STATS);
        tracing::debug!(refreshed, "Strategy views invalidated.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::HttpApiClient;
    use configuration::{ApiConfig, CacheConfig};
    use httpmock::prelude::*;
    use query_cache::SystemClock;
    use serde_json::json;

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

    async fn wait_for<T: Send + Sync + 'static>(sub: &Subscription<T>) {
        for _ in 0..200 {
            if !sub.snapshot().is_loading {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("query {} never settled", sub.key());
    }

    #[tokio::test]
    async fn orders_hook_passes_limit_and_keys_by_it() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders/recent").query_param("limit", "25");
                then.status(200).json_body(json!({"orders": []}));
            })
            .await;

        let hooks = hooks(&server);
        let sub = hooks.orders(25, true);
        wait_for(&sub).await;

        mock.assert_async().await;
        assert_eq!(sub.key().to_string(), "orders/recent?limit=25");
        assert!(sub.snapshot().data.is_some());
    }

    #[tokio::test]
    async fn logs_hook_keys_by_filter() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/logs").query_param("level", "ERROR");
                then.status(200).json_body(json!({"logs": [], "total": 0}));
            })
            .await;

        let hooks = hooks(&server);
        let filter = LogFilter {
            level: Some("ERROR".to_string()),
            ..LogFilter::with_limit(10)
        };
        let sub = hooks.logs(filter, true);
        wait_for(&sub).await;

        assert_eq!(sub.key().to_string(), "logs?level=ERROR&limit=10");
        assert_eq!(sub.snapshot().data.map(|r| r.total), Some(Some(0)));
    }

    #[tokio::test]
    async fn risk_update_refreshes_the_risk_view() {
        let server = MockServer::start_async().await;
        let read = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/risk/limits");
                then.status(200).json_body(json!({"max_leverage": 3.0}));
            })
            .await;
        let write = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/risk/limits")
                    .json_body(json!({"max_leverage": 2.0}));
                then.status(200).json_body(json!({"max_leverage": 2.0}));
            })
            .await;

        let hooks = hooks(&server);
        let sub = hooks.risk_limits(true);
        wait_for(&sub).await;
        assert_eq!(read.hits_async().await, 1);

        let update = RiskLimitsUpdate {
            max_leverage: Some(2.0),
            ..Default::default()
        };
        let limits = hooks.update_risk_limits(&update).await.unwrap();
        assert_eq!(limits.max_leverage, Some(2.0));
        write.assert_async().await;

        for _ in 0..200 {
            if read.hits_async().await >= 2 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("risk limits were not refetched after the update");
    }

    #[tokio::test]
    async fn disabled_hook_does_not_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/risk/limits");
                then.status(200).json_body(json!({}));
            })
            .await;

        let hooks = hooks(&server);
        let sub = hooks.risk_limits(false);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(mock.hits_async().await, 0);
        assert!(sub.snapshot().is_loading);
    }
}
