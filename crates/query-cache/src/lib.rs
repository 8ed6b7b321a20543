//! # Watchtower Query Cache
//!
//! A polled, cached view of backend endpoints.
//!
//! Each endpoint + parameter combination is a [`QueryKey`]. Consumers
//! [`subscribe`](QueryCache::subscribe) to a key with a fetch function and a
//! refetch interval and read immutable [`QuerySnapshot`]s back. The cache
//! guarantees at most one outstanding request per key, keeps the last good
//! value across failed refreshes, and evicts entries nobody watches anymore.
//!
//! The store is an explicit object: create it with [`QueryCache::start`] when
//! the application starts and call [`QueryCache::shutdown`] on exit.

pub mod cache;
pub mod clock;
pub mod key;
pub mod snapshot;
pub mod task;

pub use cache::{QueryCache, QueryOptions, Subscription, TickOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::QueryKey;
pub use snapshot::QuerySnapshot;
pub use task::TaskHandle;
