use crate::clock::Clock;
use crate::key::QueryKey;
use crate::snapshot::QuerySnapshot;
use crate::task::TaskHandle;
use api_client::error::ApiError;
use configuration::CacheConfig;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

type AnyData = Arc<dyn Any + Send + Sync>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyData, ApiError>> + Send + Sync>;

/// Per-subscription polling options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How often to refetch while subscribed; `None` fetches once on subscribe.
    pub refetch_interval: Option<Duration>,
    /// A disabled subscription does not keep its entry polling.
    pub enabled: bool,
}

impl QueryOptions {
    pub fn polling(interval: Duration) -> Self {
        Self {
            refetch_interval: Some(interval),
            enabled: true,
        }
    }

    pub fn once() -> Self {
        Self {
            refetch_interval: None,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// What a poll tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A request was started.
    Issued,
    /// A request for the key is still outstanding; the tick was dropped.
    InFlight,
    /// No enabled subscriber; the tick was skipped.
    Disabled,
    /// The key is not in the cache.
    Missing,
}

struct Entry {
    fetcher: Fetcher,
    data: Option<AnyData>,
    error: Option<Arc<ApiError>>,
    updated_at_ms: i64,
    last_fetch_ok: Option<bool>,
    in_flight: bool,
    /// Observer id -> enabled flag.
    observers: HashMap<u64, bool>,
    poller: Option<TaskHandle>,
    /// Bumped whenever the poller is torn down; responses started under an
    /// older generation are discarded.
    generation: u64,
    inactive_since_ms: Option<i64>,
}

impl Entry {
    fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            data: None,
            error: None,
            updated_at_ms: 0,
            last_fetch_ok: None,
            in_flight: false,
            observers: HashMap::new(),
            poller: None,
            generation: 0,
            inactive_since_ms: None,
        }
    }

    fn is_enabled(&self) -> bool {
        self.observers.values().any(|enabled| *enabled)
    }
}

struct Shared {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    next_observer: AtomicU64,
    sweeper: Mutex<Option<TaskHandle>>,
}

/// The query store. Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct QueryCache {
    shared: Arc<Shared>,
}

impl QueryCache {
    /// Creates an empty store without a garbage-collection task; call
    /// [`collect_garbage`](Self::collect_garbage) yourself or use [`start`](Self::start).
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                clock,
                entries: Mutex::new(HashMap::new()),
                next_observer: AtomicU64::new(1),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Creates the store and spawns its garbage-collection sweeper.
    /// Must be called within a tokio runtime.
    pub fn start(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = Self::new(config, clock);
        let sweeper = spawn_sweeper(
            Arc::downgrade(&cache.shared),
            cache.shared.config.gc_interval(),
        );
        *lock(&cache.shared.sweeper) = Some(sweeper);
        tracing::debug!("Query cache started.");
        cache
    }

    /// Cancels every poller and the sweeper and drops all entries.
    /// Outstanding requests finish in the background and are discarded.
    pub fn shutdown(&self) {
        lock(&self.shared.sweeper).take();
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        tracing::debug!(entries = count, "Query cache shut down.");
    }

    /// Registers an observer of `key` and returns its subscription.
    ///
    /// The first observer of a key installs `fetch` and, when
    /// `options.refetch_interval` is set, the key's poll timer; later observers
    /// share both. Subscribing issues a tick right away, so a fresh key starts
    /// loading immediately. Must be called within a tokio runtime.
    pub fn subscribe<T, F, Fut>(&self, key: QueryKey, fetch: F, options: QueryOptions) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let observer = self.shared.next_observer.fetch_add(1, Ordering::Relaxed);
        {
            let mut entries = self.entries();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(erase(fetch)));
            entry.observers.insert(observer, options.enabled);
            entry.inactive_since_ms = None;

            if entry.poller.is_none() {
                if let Some(interval) = options.refetch_interval {
                    entry.poller = Some(spawn_poller(
                        Arc::downgrade(&self.shared),
                        key.clone(),
                        interval,
                    ));
                }
            }
        }
        tracing::trace!(%key, observer, "Subscribed.");

        self.tick(&key);

        Subscription {
            cache: self.clone(),
            key,
            observer,
            _marker: PhantomData,
        }
    }

    /// Runs one poll tick for `key`: skipped while disabled, dropped while a
    /// request is outstanding, otherwise starts a fetch.
    pub fn tick(&self, key: &QueryKey) -> TickOutcome {
        self.begin_fetch(key, false)
    }

    /// Fetches `key` now, even if no subscriber has it enabled. Still a no-op
    /// while a request for the key is outstanding.
    pub fn refetch(&self, key: &QueryKey) -> TickOutcome {
        self.begin_fetch(key, true)
    }

    /// Ticks every enabled entry of `endpoint`, whatever its parameters.
    /// Returns how many requests were started.
    pub fn invalidate(&self, endpoint: &str) -> usize {
        let keys: Vec<QueryKey> = self
            .entries()
            .iter()
            .filter(|(key, entry)| key.endpoint() == endpoint && entry.is_enabled())
            .map(|(key, _)| key.clone())
            .collect();

        keys.iter()
            .filter(|key| self.tick(key) == TickOutcome::Issued)
            .count()
    }

    /// A snapshot of `key`, or `None` if the key is not cached or holds a
    /// value of another type.
    pub fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QuerySnapshot<T>> {
        let entries = self.entries();
        let entry = entries.get(key)?;

        let data = match &entry.data {
            Some(data) => match Arc::clone(data).downcast::<T>() {
                Ok(data) => Some(data),
                Err(_) => {
                    tracing::warn!(%key, "Cached value has an unexpected type.");
                    return None;
                }
            },
            None => None,
        };

        let is_loading = data.is_none()
            && entry.error.is_none()
            && (entry.in_flight || entry.last_fetch_ok.is_none());

        Some(QuerySnapshot {
            data,
            error: entry.error.clone(),
            is_loading,
            is_fetching: entry.in_flight,
            updated_at_ms: entry.updated_at_ms,
            last_fetch_ok: entry.last_fetch_ok,
        })
    }

    /// Evicts entries that have had no observer for at least `gc_time`.
    /// Entries with an outstanding request are kept until it completes.
    pub fn collect_garbage(&self) -> usize {
        let now = self.shared.clock.now_ms();
        let gc_time_ms = self.shared.config.gc_time_ms as i64;

        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, entry| {
            let expired = entry.observers.is_empty()
                && !entry.in_flight
                && entry
                    .inactive_since_ms
                    .is_some_and(|since| now - since >= gc_time_ms);
            if expired {
                tracing::debug!(%key, "Evicting inactive query.");
            }
            !expired
        });
        before - entries.len()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn now_ms(&self) -> i64 {
        self.shared.clock.now_ms()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        lock(&self.shared.entries)
    }

    fn begin_fetch(&self, key: &QueryKey, force: bool) -> TickOutcome {
        let (fetcher, generation) = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(key) else {
                return TickOutcome::Missing;
            };
            if !force && !entry.is_enabled() {
                tracing::trace!(%key, "Tick skipped, query disabled.");
                return TickOutcome::Disabled;
            }
            if entry.in_flight {
                tracing::trace!(%key, "Tick dropped, request outstanding.");
                return TickOutcome::InFlight;
            }
            entry.in_flight = true;
            (Arc::clone(&entry.fetcher), entry.generation)
        };

        let weak = Arc::downgrade(&self.shared);
        let retry = self.shared.config.retry;
        let retry_delay = self.shared.config.retry_delay();
        let key = key.clone();
        tokio::spawn(async move {
            let result = fetch_with_retry(&fetcher, retry, retry_delay, &key).await;
            if let Some(shared) = weak.upgrade() {
                QueryCache { shared }.complete(&key, generation, result);
            }
        });

        TickOutcome::Issued
    }

    fn complete(&self, key: &QueryKey, generation: u64, result: Result<AnyData, ApiError>) {
        let now = self.shared.clock.now_ms();
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            tracing::debug!(%key, "Discarding response for an evicted query.");
            return;
        };

        entry.in_flight = false;
        if entry.generation != generation {
            tracing::debug!(%key, "Discarding response for a torn-down query.");
            // An observer that arrived while the stale request was out had
            // its tick dropped; fetch for it now.
            let revived = entry.is_enabled();
            drop(entries);
            if revived {
                self.tick(key);
            }
            return;
        }

        match result {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
                entry.updated_at_ms = now;
                entry.last_fetch_ok = Some(true);
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Query fetch failed.");
                entry.error = Some(Arc::new(e));
                entry.last_fetch_ok = Some(false);
            }
        }
    }

    fn set_enabled(&self, key: &QueryKey, observer: u64, enabled: bool) {
        let became_enabled = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            let was_enabled = entry.is_enabled();
            let Some(flag) = entry.observers.get_mut(&observer) else {
                return;
            };
            *flag = enabled;
            !was_enabled && entry.is_enabled()
        };

        if became_enabled {
            self.tick(key);
        }
    }

    fn unsubscribe(&self, key: &QueryKey, observer: u64) {
        let now = self.shared.clock.now_ms();
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };

        entry.observers.remove(&observer);
        if entry.observers.is_empty() {
            entry.poller = None;
            entry.generation += 1;
            entry.inactive_since_ms = Some(now);
            tracing::trace!(%key, "Last observer left, polling stopped.");
        }
    }
}

/// A registered interest in one key. Dropping the last subscription of a
/// key stops its polling.
pub struct Subscription<T> {
    cache: QueryCache,
    key: QueryKey,
    observer: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// The current state of the key; a loading snapshot if the cache was
    /// shut down underneath this subscription.
    pub fn snapshot(&self) -> QuerySnapshot<T> {
        self.cache
            .snapshot(&self.key)
            .unwrap_or_else(QuerySnapshot::pending)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.cache.set_enabled(&self.key, self.observer, enabled);
    }

    pub fn refetch(&self) -> TickOutcome {
        self.cache.refetch(&self.key)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key, self.observer);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn erase<T, F, Fut>(fetch: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    Arc::new(move || {
        let future = fetch();
        async move { future.await.map(|data| Arc::new(data) as AnyData) }.boxed()
    })
}

async fn fetch_with_retry(
    fetcher: &Fetcher,
    retry: u32,
    retry_delay: Duration,
    key: &QueryKey,
) -> Result<AnyData, ApiError> {
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(data) => return Ok(data),
            Err(e) if attempt < retry => {
                attempt += 1;
                tracing::debug!(%key, attempt, error = %e, "Fetch failed, retrying.");
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn spawn_poller(shared: Weak<Shared>, key: QueryKey, interval: Duration) -> TaskHandle {
    TaskHandle::spawn(async move {
        // The subscribe call already fetched; the first timed tick is one interval out.
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(shared) = shared.upgrade() else {
                break;
            };
            let outcome = QueryCache { shared }.tick(&key);
            tracing::trace!(%key, ?outcome, "Poll tick.");
        }
    })
}

fn spawn_sweeper(shared: Weak<Shared>, interval: Duration) -> TaskHandle {
    TaskHandle::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(shared) = shared.upgrade() else {
                break;
            };
            let evicted = QueryCache { shared }.collect_garbage();
            if evicted > 0 {
                tracing::debug!(evicted, "Garbage-collected inactive queries.");
            }
        }
    })
}
