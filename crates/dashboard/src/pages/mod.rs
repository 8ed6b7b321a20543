use configuration::PageId;
use query_cache::Subscription;

pub mod logs;
pub mod orders;
pub mod overview;
pub mod portfolio;
pub mod risk;
pub mod signals;
pub mod strategies;

pub use logs::LogsPage;
pub use orders::OrdersPage;
pub use overview::OverviewPage;
pub use portfolio::PortfolioPage;
pub use risk::RiskPage;
pub use signals::SignalsPage;
pub use strategies::StrategiesPage;

/// A console page: a set of queries plus the text they render to.
pub trait Page: Send + Sync {
    fn id(&self) -> PageId;

    fn title(&self) -> &'static str;

    /// Enables or pauses every query of the page.
    fn set_active(&self, active: bool);

    /// Every query has either data or an error.
    fn is_settled(&self) -> bool;

    fn render(&self, now_ms: i64) -> String;
}

/// The type-independent part of a subscription, so a page can toggle all of
/// its queries at once.
pub(crate) trait Query {
    fn set_enabled(&self, enabled: bool);
    fn is_settled(&self) -> bool;
}

impl<T: Send + Sync + 'static> Query for Subscription<T> {
    fn set_enabled(&self, enabled: bool) {
        Subscription::set_enabled(self, enabled);
    }

    fn is_settled(&self) -> bool {
        !self.snapshot().is_loading
    }
}

pub(crate) fn set_all(queries: &[&dyn Query], enabled: bool) {
    for query in queries {
        query.set_enabled(enabled);
    }
}

pub(crate) fn all_settled(queries: &[&dyn Query]) -> bool {
    queries.iter().all(|query| query.is_settled())
}
