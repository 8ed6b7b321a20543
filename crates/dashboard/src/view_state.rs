use api_client::error::ApiError;
use query_cache::QuerySnapshot;
use std::sync::Arc;

/// What a data-bound view should show for one query.
#[derive(Debug)]
pub enum ViewState<T> {
    /// No data and no error yet.
    Loading,
    /// The query failed before it ever produced data.
    Error(Arc<ApiError>),
    /// Data arrived but has nothing to list. `stale_error` as for `Ready`.
    Empty { stale_error: Option<Arc<ApiError>> },
    /// Data to show. `stale_error` is set when the latest refresh failed and
    /// the data is the last good copy.
    Ready {
        data: Arc<T>,
        stale_error: Option<Arc<ApiError>>,
    },
}

impl<T> ViewState<T> {
    /// Resolves a snapshot; `is_empty` decides whether present data counts as empty.
    pub fn resolve(snapshot: &QuerySnapshot<T>, is_empty: impl Fn(&T) -> bool) -> Self {
        match (&snapshot.data, &snapshot.error) {
            (Some(data), error) if is_empty(data.as_ref()) => ViewState::Empty {
                stale_error: error.clone(),
            },
            (Some(data), error) => ViewState::Ready {
                data: Arc::clone(data),
                stale_error: error.clone(),
            },
            (None, Some(error)) => ViewState::Error(Arc::clone(error)),
            (None, None) => ViewState::Loading,
        }
    }

    /// Resolves a snapshot whose data is never considered empty.
    pub fn from_snapshot(snapshot: &QuerySnapshot<T>) -> Self {
        Self::resolve(snapshot, |_| false)
    }
}

impl<T> ViewState<Vec<T>> {
    pub fn from_list(snapshot: &QuerySnapshot<Vec<T>>) -> Self {
        Self::resolve(snapshot, Vec::is_empty)
    }
}
