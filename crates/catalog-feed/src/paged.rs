//! Incremental paging over a [`PageSource`].
//!
//! A [`PagedFetchController`] owns one growing, deduplicated item list. It is
//! edge-triggered: consumers call [`PagedFetchController::request_more`]
//! whenever they want more data, and triggers that arrive while a fetch is
//! outstanding collapse into no-ops. Each sequence carries a generation
//! ([`Epoch`]); a reset starts a new one and every result is checked against
//! the live generation before it is applied.

use crate::epoch::{Epoch, Tagged};
use crate::error::FetchError;
use crate::source::PageSource;
use shared::Page;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

type KeyFn<T, K> = Box<dyn Fn(&T) -> K + Send + Sync>;

/// Why `request_more` did not issue a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A fetch for this sequence is already in flight
    Pending,
    /// The source reported no further pages
    Exhausted,
    /// The requested filters equal the active ones
    Unchanged,
    /// The controller was closed
    Closed,
}

/// Result of one trigger
#[derive(Debug)]
pub enum FetchOutcome {
    /// A page was merged into the sequence
    Merged {
        page: u32,
        added: usize,
        exhausted: bool,
    },
    /// No fetch was issued
    Skipped(SkipReason),
    /// The fetch failed; the sequence is unchanged and may be retried
    Failed(FetchError),
    /// The result belonged to a superseded generation and was dropped
    Stale,
}

impl FetchOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, FetchOutcome::Merged { .. })
    }
}

/// Point-in-time copy of a sequence
#[derive(Debug, Clone)]
pub struct SequenceSnapshot<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub exhausted: bool,
    pub pending: bool,
    pub generation: Epoch,
    pub total: Option<u64>,
}

struct SequenceState<S: PageSource, K> {
    source: Arc<S>,
    items: Vec<S::Item>,
    keys: HashSet<K>,
    current_page: u32,
    exhausted: bool,
    pending: bool,
    generation: Epoch,
    total: Option<u64>,
    closed: bool,
}

enum Attempt<T> {
    Fetched(Result<Page<T>, FetchError>),
    Superseded,
}

/// One paginated, append-only sequence
pub struct PagedFetchController<S: PageSource, K = i64> {
    state: Mutex<SequenceState<S, K>>,
    key_of: Option<KeyFn<S::Item, K>>,
    fetch_timeout: Option<Duration>,
    generation_tx: watch::Sender<Epoch>,
}

impl<S: PageSource> PagedFetchController<S> {
    /// Sequence without deduplication; items are trusted unique
    pub fn new(source: S, initial_items: Vec<S::Item>, initial_has_more: bool) -> Self {
        Self::build(source, initial_items, initial_has_more, None)
    }
}

impl<S, K> PagedFetchController<S, K>
where
    S: PageSource,
    K: Eq + Hash + Send,
{
    /// Sequence deduplicated by `key_of`
    ///
    /// Duplicates inside `initial_items` are dropped too, keeping the first.
    pub fn keyed(
        source: S,
        initial_items: Vec<S::Item>,
        initial_has_more: bool,
        key_of: impl Fn(&S::Item) -> K + Send + Sync + 'static,
    ) -> Self {
        Self::build(source, initial_items, initial_has_more, Some(Box::new(key_of)))
    }

    fn build(
        source: S,
        initial_items: Vec<S::Item>,
        initial_has_more: bool,
        key_of: Option<KeyFn<S::Item, K>>,
    ) -> Self {
        let generation = Epoch::ZERO.next();
        let (generation_tx, _) = watch::channel(generation);

        let mut state = SequenceState {
            source: Arc::new(source),
            items: Vec::with_capacity(initial_items.len()),
            keys: HashSet::new(),
            current_page: 1,
            exhausted: !initial_has_more,
            pending: false,
            generation,
            total: None,
            closed: false,
        };
        merge_items(&mut state, key_of.as_ref(), initial_items);

        Self {
            state: Mutex::new(state),
            key_of,
            fetch_timeout: None,
            generation_tx,
        }
    }

    /// Treat a fetch that takes longer than `timeout` as failed
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn with_total(self, total: Option<u64>) -> Self {
        self.lock().total = total;
        self
    }

    /// Fetch and merge the next page, unless one is in flight or the
    /// sequence is finished
    ///
    /// Never fails: fetch errors are logged and reported as
    /// [`FetchOutcome::Failed`] with the sequence left as it was. Dropping
    /// the returned future abandons the fetch the same way, so the next
    /// trigger can try again.
    pub async fn request_more(&self) -> FetchOutcome {
        let (source, page, generation) = {
            let mut state = self.lock();
            if state.closed {
                return FetchOutcome::Skipped(SkipReason::Closed);
            }
            if state.pending {
                return FetchOutcome::Skipped(SkipReason::Pending);
            }
            if state.exhausted {
                return FetchOutcome::Skipped(SkipReason::Exhausted);
            }
            state.pending = true;
            (Arc::clone(&state.source), state.current_page + 1, state.generation)
        };

        debug!(page, generation = %generation, "Requesting next page");
        let guard = PendingGuard::new(&self.state, generation);
        let attempt = self.fetch(&source, page, generation).await;
        guard.disarm();
        self.commit(page, Tagged::new(generation, attempt))
    }

    /// Discard the sequence and load page 1 from `source`
    pub async fn reset(&self, source: S) -> FetchOutcome {
        match self.begin_generation(source) {
            Some((generation, source)) => self.load_first_page(generation, source).await,
            None => FetchOutcome::Skipped(SkipReason::Closed),
        }
    }

    /// Start a new, empty generation backed by `source`
    ///
    /// The sequence is marked pending for the page-1 fetch, and anything in
    /// flight for the old generation is told to stop.
    pub(crate) fn begin_generation(&self, source: S) -> Option<(Epoch, Arc<S>)> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }

        let generation = state.generation.next();
        state.generation = generation;
        state.source = Arc::new(source);
        state.items.clear();
        state.keys.clear();
        state.current_page = 0;
        state.exhausted = false;
        state.pending = true;
        state.total = None;
        self.generation_tx.send_replace(generation);

        Some((generation, Arc::clone(&state.source)))
    }

    pub(crate) async fn load_first_page(&self, generation: Epoch, source: Arc<S>) -> FetchOutcome {
        debug!(generation = %generation, "Loading first page");
        let guard = PendingGuard::new(&self.state, generation);
        let attempt = self.fetch(&source, 1, generation).await;
        guard.disarm();
        self.commit(1, Tagged::new(generation, attempt))
    }

    /// Stop the sequence: abandon any in-flight fetch and refuse new ones
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.pending = false;
        state.generation = state.generation.next();
        self.generation_tx.send_replace(state.generation);
    }

    async fn fetch(&self, source: &S, page: u32, generation: Epoch) -> Attempt<S::Item> {
        let fetch = async {
            match self.fetch_timeout {
                Some(limit) => match tokio::time::timeout(limit, source.fetch_page(page)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(limit)),
                },
                None => source.fetch_page(page).await,
            }
        };

        let mut generation_rx = self.generation_tx.subscribe();
        tokio::select! {
            result = fetch => Attempt::Fetched(result),
            _ = generation_rx.wait_for(|live| *live != generation) => Attempt::Superseded,
        }
    }

    fn commit(&self, page: u32, tagged: Tagged<Attempt<S::Item>>) -> FetchOutcome {
        let mut state = self.lock();
        if !tagged.is_current(state.generation) {
            debug!(page, generation = %tagged.epoch, "Dropping result of superseded generation");
            return FetchOutcome::Stale;
        }

        state.pending = false;
        match tagged.value {
            Attempt::Fetched(Ok(fetched)) => {
                let exhausted = !fetched.has_next();
                if fetched.total().is_some() {
                    state.total = fetched.total();
                }
                let added = merge_items(&mut *state, self.key_of.as_ref(), fetched.results);
                state.current_page = page;
                state.exhausted = exhausted;
                debug!(page, added, exhausted, total_items = state.items.len(), "Merged page");
                FetchOutcome::Merged {
                    page,
                    added,
                    exhausted,
                }
            }
            Attempt::Fetched(Err(error)) => {
                warn!(page, error = %error, "Page fetch failed, keeping current items");
                FetchOutcome::Failed(error)
            }
            Attempt::Superseded => FetchOutcome::Stale,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SequenceState<S, K>> {
        // every critical section leaves the state consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock().exhausted
    }

    pub fn has_more(&self) -> bool {
        !self.is_exhausted()
    }

    pub fn current_page(&self) -> u32 {
        self.lock().current_page
    }

    pub fn generation(&self) -> Epoch {
        self.lock().generation
    }

    pub fn total(&self) -> Option<u64> {
        self.lock().total
    }

    /// Run `f` against the current items without copying them
    pub fn with_items<R>(&self, f: impl FnOnce(&[S::Item]) -> R) -> R {
        f(&self.lock().items)
    }

    pub fn snapshot(&self) -> SequenceSnapshot<S::Item>
    where
        S::Item: Clone,
    {
        let state = self.lock();
        SequenceSnapshot {
            items: state.items.clone(),
            current_page: state.current_page,
            exhausted: state.exhausted,
            pending: state.pending,
            generation: state.generation,
            total: state.total,
        }
    }
}

/// Clears `pending` when a fetch is dropped before its result is committed
///
/// Only acts while the fetch's generation is still live; a newer generation
/// owns the flag by then.
struct PendingGuard<'a, S: PageSource, K> {
    state: &'a Mutex<SequenceState<S, K>>,
    generation: Epoch,
    armed: bool,
}

impl<'a, S: PageSource, K> PendingGuard<'a, S, K> {
    fn new(state: &'a Mutex<SequenceState<S, K>>, generation: Epoch) -> Self {
        Self {
            state,
            generation,
            armed: true,
        }
    }

    /// The result is about to be committed, which settles `pending` itself
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<S: PageSource, K> Drop for PendingGuard<'_, S, K> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == self.generation && state.pending {
            state.pending = false;
            debug!(generation = %self.generation, "Fetch dropped by caller, sequence stays as it was");
        }
    }
}

/// Append `incoming`, skipping items whose key is already present
fn merge_items<S, K>(
    state: &mut SequenceState<S, K>,
    key_of: Option<&KeyFn<S::Item, K>>,
    incoming: Vec<S::Item>,
) -> usize
where
    S: PageSource,
    K: Eq + Hash,
{
    let before = state.items.len();
    match key_of {
        Some(key_of) => {
            for item in incoming {
                if state.keys.insert(key_of(&item)) {
                    state.items.push(item);
                }
            }
        }
        None => state.items.extend(incoming),
    }
    state.items.len() - before
}
