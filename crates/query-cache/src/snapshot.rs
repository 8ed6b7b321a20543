use api_client::error::ApiError;
use std::fmt;
use std::sync::Arc;

/// An immutable view of one cache entry at the moment it was taken.
pub struct QuerySnapshot<T> {
    /// The last successful response, kept across failed refreshes.
    pub data: Option<Arc<T>>,
    /// The failure of the most recent fetch, cleared by the next success.
    pub error: Option<Arc<ApiError>>,
    /// Nothing to show yet: no data, no error.
    pub is_loading: bool,
    /// A request for this key is outstanding.
    pub is_fetching: bool,
    /// Unix milliseconds of the last successful fetch; `0` if there was none.
    pub updated_at_ms: i64,
    /// Outcome of the most recent completed fetch; `None` before the first one.
    pub last_fetch_ok: Option<bool>,
}

impl<T> QuerySnapshot<T> {
    /// The snapshot of a key that has not been fetched yet.
    pub fn pending() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: true,
            is_fetching: false,
            updated_at_ms: 0,
            last_fetch_ok: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.last_fetch_ok == Some(true)
    }

    /// Data is being shown although the latest refresh failed.
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            updated_at_ms: self.updated_at_ms,
            last_fetch_ok: self.last_fetch_ok,
        }
    }
}

impl<T> fmt::Debug for QuerySnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySnapshot")
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("is_loading", &self.is_loading)
            .field("is_fetching", &self.is_fetching)
            .field("updated_at_ms", &self.updated_at_ms)
            .field("last_fetch_ok", &self.last_fetch_ok)
            .finish()
    }
}
