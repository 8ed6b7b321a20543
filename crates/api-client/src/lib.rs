use crate::error::ApiError;
use crate::responses::{DaysQuery, ErrorBody, LimitQuery, TailQuery};
use async_trait::async_trait;
use configuration::ApiConfig;
use core_types::{
    AuthStatus, EngineLogsTailResponse, EngineStatus, LogFilter, LogsResponse, OrdersResponse,
    Portfolio, PortfolioSummary, RiskLimits, RiskLimitsUpdate, ServerTime, ServiceMeta, Signal,
    StrategyDetail, StrategyParamsUpdate, StrategyStats,
};
use reqwest::Url;
use serde::{de::DeserializeOwned, Serialize};

pub mod error;
pub mod responses;

/// Every backend path lives under this segment.
const API_PREFIX: &str = "api";

/// The contract between the console and the trading backend.
///
/// One method per backend operation. Each call issues exactly one HTTP
/// request: no retries, no timeout, no caching. Failures propagate unchanged,
/// so the query layer can decide what to do with them.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// `GET /api/meta`
    async fn meta(&self) -> Result<ServiceMeta, ApiError>;

    /// `GET /api/auth/status`
    async fn auth_status(&self) -> Result<AuthStatus, ApiError>;

    /// `GET /api/system/time`, the heartbeat used to infer connectivity.
    async fn system_time(&self) -> Result<ServerTime, ApiError>;

    /// `GET /api/engines/status`
    async fn engines_status(&self) -> Result<Vec<EngineStatus>, ApiError>;

    /// `GET /api/portfolio`
    async fn portfolio(&self) -> Result<Portfolio, ApiError>;

    /// `GET /api/portfolio/summary`
    async fn portfolio_summary(&self) -> Result<PortfolioSummary, ApiError>;

    /// `GET /api/orders/recent?limit=`
    async fn recent_orders(&self, limit: u32) -> Result<OrdersResponse, ApiError>;

    /// `GET /api/signals/recent?limit=`
    async fn recent_signals(&self, limit: u32) -> Result<Vec<Signal>, ApiError>;

    /// `GET /api/stats/strategies?days=`
    async fn strategy_stats(&self, days: u32) -> Result<Vec<StrategyStats>, ApiError>;

    /// `GET /api/strategies`
    async fn strategies(&self) -> Result<Vec<StrategyDetail>, ApiError>;

    /// `GET /api/risk/limits`
    async fn risk_limits(&self) -> Result<RiskLimits, ApiError>;

    /// `POST /api/risk/limits` with a partial body; returns the limits now in force.
    async fn update_risk_limits(&self, update: &RiskLimitsUpdate) -> Result<RiskLimits, ApiError>;

    /// `POST /api/strategies/{id}/enable`
    async fn enable_strategy(&self, id: &str) -> Result<StrategyDetail, ApiError>;

    /// `POST /api/strategies/{id}/disable`
    async fn disable_strategy(&self, id: &str) -> Result<StrategyDetail, ApiError>;

    /// `POST /api/strategies/{id}/params`
    async fn update_strategy_params(
        &self,
        id: &str,
        update: &StrategyParamsUpdate,
    ) -> Result<StrategyDetail, ApiError>;

    /// `GET /api/logs`
    async fn logs(&self, filter: &LogFilter) -> Result<LogsResponse, ApiError>;

    /// `GET /api/logs/tail?engine=&lines=`
    async fn logs_tail(&self, engine: &str, lines: u32) -> Result<EngineLogsTailResponse, ApiError>;
}

/// The `reqwest` implementation of [`ApiClient`].
#[derive(Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApiClient {
    pub fn new(api_config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(api_config.base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", api_config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(api_config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("watchtower/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `segments` under `<base>/api`, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().push(API_PREFIX);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn _get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: Option<&impl Serialize>,
    ) -> Result<T, ApiError> {
        let mut url = self.endpoint(segments)?;
        if let Some(query) = query {
            let query_string =
                serde_qs::to_string(query).map_err(|e| ApiError::Encoding(e.to_string()))?;
            if !query_string.is_empty() {
                url.set_query(Some(&query_string));
            }
        }

        tracing::trace!(%url, "GET");
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn _post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: Option<&impl Serialize>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;

        tracing::trace!(%url, "POST");
        let request = self.client.post(url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        let response = request.send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(ErrorBody::into_message);
            Err(ApiError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
                message,
            })
        }
    }
}

// Placeholder type for the `query` argument of body-less, parameterless calls.
type NoQuery = ();

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn meta(&self) -> Result<ServiceMeta, ApiError> {
        self._get(&["meta"], None::<&NoQuery>).await
    }

    async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
        self._get(&["auth", "status"], None::<&NoQuery>).await
    }

    async fn system_time(&self) -> Result<ServerTime, ApiError> {
        self._get(&["system", "time"], None::<&NoQuery>).await
    }

    async fn engines_status(&self) -> Result<Vec<EngineStatus>, ApiError> {
        self._get(&["engines", "status"], None::<&NoQuery>).await
    }

    async fn portfolio(&self) -> Result<Portfolio, ApiError> {
        self._get(&["portfolio"], None::<&NoQuery>).await
    }

    async fn portfolio_summary(&self) -> Result<PortfolioSummary, ApiError> {
        self._get(&["portfolio", "summary"], None::<&NoQuery>).await
    }

    async fn recent_orders(&self, limit: u32) -> Result<OrdersResponse, ApiError> {
        self._get(&["orders", "recent"], Some(&LimitQuery { limit })).await
    }

    async fn recent_signals(&self, limit: u32) -> Result<Vec<Signal>, ApiError> {
        self._get(&["signals", "recent"], Some(&LimitQuery { limit })).await
    }

    async fn strategy_stats(&self, days: u32) -> Result<Vec<StrategyStats>, ApiError> {
        self._get(&["stats", "strategies"], Some(&DaysQuery { days })).await
    }

    async fn strategies(&self) -> Result<Vec<StrategyDetail>, ApiError> {
        self._get(&["strategies"], None::<&NoQuery>).await
    }

    async fn risk_limits(&self) -> Result<RiskLimits, ApiError> {
        self._get(&["risk", "limits"], None::<&NoQuery>).await
    }

    async fn update_risk_limits(&self, update: &RiskLimitsUpdate) -> Result<RiskLimits, ApiError> {
        self._post(&["risk", "limits"], Some(update)).await
    }

    async fn enable_strategy(&self, id: &str) -> Result<StrategyDetail, ApiError> {
        self._post(&["strategies", id, "enable"], None::<&NoQuery>).await
    }

    async fn disable_strategy(&self, id: &str) -> Result<StrategyDetail, ApiError> {
        self._post(&["strategies", id, "disable"], None::<&NoQuery>).await
    }

    async fn update_strategy_params(
        &self,
        id: &str,
        update: &StrategyParamsUpdate,
    ) -> Result<StrategyDetail, ApiError> {
        self._post(&["strategies", id, "params"], Some(update)).await
    }

    async fn logs(&self, filter: &LogFilter) -> Result<LogsResponse, ApiError> {
        self._get(&["logs"], Some(filter)).await
    }

    async fn logs_tail(&self, engine: &str, lines: u32) -> Result<EngineLogsTailResponse, ApiError> {
        self._get(&["logs", "tail"], Some(&TailQuery { engine, lines })).await
    }
}
