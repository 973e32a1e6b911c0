//! Filter-driven listings.
//!
//! A [`FilterQueryController`] keeps one [`PagedFetchController`] and restarts
//! it from page 1 every time the filter set changes. The restart bumps the
//! sequence generation, which both aborts the old in-flight request and makes
//! any result that still slips through a no-op.

use crate::debounce::Debouncer;
use crate::paged::{FetchOutcome, PagedFetchController, SkipReason};
use crate::source::{BoundQuery, QuerySource};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

struct FilterState<F> {
    current: F,
    mounted: bool,
}

/// Paged listing whose contents are determined by a filter set
pub struct FilterQueryController<Q: QuerySource, K = i64> {
    source: Arc<Q>,
    filters: Mutex<FilterState<Q::Query>>,
    sequence: PagedFetchController<BoundQuery<Q>, K>,
}

impl<Q: QuerySource> FilterQueryController<Q> {
    /// Controller without deduplication
    pub fn new(source: Q, filters: Q::Query) -> Self {
        let source = Arc::new(source);
        let bound = BoundQuery::new(Arc::clone(&source), filters.clone());
        let sequence = PagedFetchController::new(bound, Vec::new(), false);
        Self::build(source, filters, sequence)
    }
}

impl<Q, K> FilterQueryController<Q, K>
where
    Q: QuerySource,
    K: Eq + Hash + Send,
{
    /// Controller whose sequences are deduplicated by `key_of`
    pub fn keyed(
        source: Q,
        filters: Q::Query,
        key_of: impl Fn(&Q::Item) -> K + Send + Sync + 'static,
    ) -> Self {
        let source = Arc::new(source);
        let bound = BoundQuery::new(Arc::clone(&source), filters.clone());
        let sequence = PagedFetchController::keyed(bound, Vec::new(), false, key_of);
        Self::build(source, filters, sequence)
    }

    fn build(
        source: Arc<Q>,
        filters: Q::Query,
        sequence: PagedFetchController<BoundQuery<Q>, K>,
    ) -> Self {
        Self {
            source,
            filters: Mutex::new(FilterState {
                current: filters,
                mounted: false,
            }),
            sequence,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.sequence = self.sequence.with_fetch_timeout(timeout);
        self
    }

    /// Load page 1 for the current filters
    ///
    /// Counts as the first filter change; calling it again starts over.
    pub async fn mount(&self) -> FetchOutcome {
        let filters = self.lock_filters().current.clone();
        self.restart(filters, true).await
    }

    /// Switch to `filters`, discarding the current sequence
    ///
    /// A set equal to the active one is a no-op once mounted.
    pub async fn set_filters(&self, filters: Q::Query) -> FetchOutcome {
        self.restart(filters, false).await
    }

    async fn restart(&self, filters: Q::Query, force: bool) -> FetchOutcome {
        let started = {
            let mut state = self.lock_filters();
            if state.mounted && !force && state.current == filters {
                debug!(filters = ?filters, "Filters unchanged, keeping sequence");
                return FetchOutcome::Skipped(SkipReason::Unchanged);
            }

            // generation bump and filter swap happen under one lock so two
            // racing changes can't leave the filters and the sequence apart
            let bound = BoundQuery::new(Arc::clone(&self.source), filters.clone());
            let started = self.sequence.begin_generation(bound);
            if started.is_some() {
                state.current = filters;
                state.mounted = true;
            }
            started
        };

        let Some((generation, source)) = started else {
            return FetchOutcome::Skipped(SkipReason::Closed);
        };

        info!(generation = %generation, filters = ?source.query(), "Filters changed, reloading");
        self.sequence.load_first_page(generation, source).await
    }

    /// Load the next page for the active filters
    pub async fn request_more(&self) -> FetchOutcome {
        self.sequence.request_more().await
    }

    pub fn filters(&self) -> Q::Query {
        self.lock_filters().current.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.lock_filters().mounted
    }

    /// The sequence for the active filters
    pub fn sequence(&self) -> &PagedFetchController<BoundQuery<Q>, K> {
        &self.sequence
    }

    /// Abandon any in-flight fetch and refuse further work
    pub fn close(&self) {
        self.sequence.close();
    }

    fn lock_filters(&self) -> MutexGuard<'_, FilterState<Q::Query>> {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Q, K> FilterQueryController<Q, K>
where
    Q: QuerySource + 'static,
    K: Eq + Hash + Send + 'static,
{
    /// Feed raw filter changes through a debouncer
    ///
    /// Only the last value of each quiet period reaches `set_filters`.
    pub fn debounced(self: &Arc<Self>, delay: Duration) -> Debouncer<Q::Query>
    where
        Q::Query: 'static,
        Q::Item: 'static,
    {
        let controller = Arc::clone(self);
        Debouncer::new(delay, move |filters| {
            let controller = Arc::clone(&controller);
            async move {
                controller.set_filters(filters).await;
            }
        })
    }
}
