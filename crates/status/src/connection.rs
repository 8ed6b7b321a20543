use query_cache::QuerySnapshot;
use std::time::Duration;

/// How long the heartbeat may go without a successful fetch before the
/// backend is considered unreachable.
pub const DISCONNECT_AFTER: Duration = Duration::from_millis(15_000);

/// Connectivity inferred from the heartbeat entry.
///
/// `is_connected` and `is_disconnected` are exact complements; both are kept
/// because the header reads more naturally with either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub is_disconnected: bool,
    /// Time since the last successful heartbeat; `None` if there never was one.
    pub time_since_update: Option<Duration>,
}

impl ConnectionStatus {
    /// Applies the connection rule to raw entry fields.
    ///
    /// `updated_at_ms` is the Unix time of the last success (`0` if none) and
    /// `last_fetch_ok` the outcome of the latest fetch.
    pub fn derive(now_ms: i64, updated_at_ms: i64, last_fetch_ok: Option<bool>) -> Self {
        let time_since_update = (updated_at_ms > 0)
            .then(|| Duration::from_millis(now_ms.saturating_sub(updated_at_ms).max(0) as u64));

        let fresh = time_since_update.is_some_and(|elapsed| elapsed < DISCONNECT_AFTER);
        let is_connected = last_fetch_ok == Some(true) && fresh;

        Self {
            is_connected,
            is_disconnected: !is_connected,
            time_since_update,
        }
    }

    /// Connection status of a heartbeat snapshot at `now_ms`.
    pub fn from_snapshot<T>(snapshot: &QuerySnapshot<T>, now_ms: i64) -> Self {
        Self::derive(now_ms, snapshot.updated_at_ms, snapshot.last_fetch_ok)
    }

    pub fn label(&self) -> &'static str {
        if self.is_connected { "CONNECTED" } else { "DISCONNECTED" }
    }
}
