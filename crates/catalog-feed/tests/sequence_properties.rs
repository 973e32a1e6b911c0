//! Ordering and staleness properties of the paging controllers, driven by a
//! source whose responses the test releases by hand.

use catalog_feed::{
    BoundQuery, FetchError, FetchOutcome, FilterQueryController, PagedFetchController,
    QuerySource, SkipReason,
};
use shared::Page;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

type Item = (i64, &'static str);
type Reply = Result<Page<Item>, FetchError>;

#[derive(Default)]
struct Gates {
    waiting: Mutex<HashMap<(String, u32), oneshot::Sender<Reply>>>,
    calls: AtomicUsize,
}

/// Every fetch blocks until the test releases it
#[derive(Clone, Default)]
struct Gated(Arc<Gates>);

impl Gated {
    fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }

    async fn wait_for(&self, query: &str, page: u32) {
        let key = (query.to_string(), page);
        while !self.0.waiting.lock().unwrap().contains_key(&key) {
            tokio::task::yield_now().await;
        }
    }

    /// Answer the fetch for `(query, page)` once it has been issued
    async fn release(&self, query: &str, page: u32, reply: Reply) {
        self.wait_for(query, page).await;
        let tx = self
            .0
            .waiting
            .lock()
            .unwrap()
            .remove(&(query.to_string(), page))
            .unwrap();
        // receiver is gone if the fetch was aborted
        let _ = tx.send(reply);
    }
}

impl QuerySource for Gated {
    type Query = String;
    type Item = Item;

    fn fetch(&self, query: &String, page: u32) -> impl Future<Output = Reply> + Send {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.0.waiting.lock().unwrap().insert((query.clone(), page), tx);
        async move {
            rx.await
                .unwrap_or_else(|_| Err(FetchError::source_error("gate closed")))
        }
    }
}

fn page(items: &[Item], has_next: bool) -> Reply {
    Ok(Page::new(items.to_vec(), has_next))
}

fn listing(
    gated: &Gated,
    initial: Vec<Item>,
    has_more: bool,
) -> PagedFetchController<BoundQuery<Gated>, i64> {
    let source = BoundQuery::new(Arc::new(gated.clone()), "all".to_string());
    PagedFetchController::keyed(source, initial, has_more, |item: &Item| item.0)
}

fn ids<S>(controller: &PagedFetchController<S, i64>) -> Vec<i64>
where
    S: catalog_feed::PageSource<Item = Item>,
{
    controller.with_items(|items| items.iter().map(|item| item.0).collect())
}

#[tokio::test]
async fn two_immediate_triggers_issue_one_fetch() {
    let gated = Gated::default();
    let controller = listing(&gated, vec![(1, "A")], true);

    let (first, second) = tokio::join!(controller.request_more(), async {
        gated.wait_for("all", 2).await;
        let second = controller.request_more().await;
        gated.release("all", 2, page(&[(2, "B")], true)).await;
        second
    });

    assert!(matches!(first, FetchOutcome::Merged { page: 2, added: 1, .. }));
    assert!(matches!(second, FetchOutcome::Skipped(SkipReason::Pending)));
    assert_eq!(gated.calls(), 1);
    assert!(!controller.is_pending());
}

#[tokio::test]
async fn items_grow_monotonically_without_duplicates() {
    let gated = Gated::default();
    let controller = listing(&gated, vec![(1, "A"), (2, "B")], true);

    let replies = [
        page(&[(2, "B"), (3, "C")], true),
        page(&[(3, "C"), (4, "D"), (1, "A")], true),
        page(&[(5, "E")], false),
    ];

    let mut previous = ids(&controller);
    for (n, reply) in replies.into_iter().enumerate() {
        let page_no = n as u32 + 2;
        let (outcome, _) = tokio::join!(controller.request_more(), gated.release("all", page_no, reply));
        assert!(outcome.is_merged());

        let current = ids(&controller);
        assert!(current.starts_with(&previous), "items must only grow");
        let mut unique = current.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), current.len(), "no duplicate keys");
        previous = current;
    }

    assert_eq!(previous, vec![1, 2, 3, 4, 5]);
    assert_eq!(controller.current_page(), 4);
    assert!(controller.is_exhausted());
}

#[tokio::test]
async fn exhaustion_is_terminal() {
    let gated = Gated::default();
    let controller = listing(&gated, vec![(1, "A")], true);

    let (outcome, _) = tokio::join!(
        controller.request_more(),
        gated.release("all", 2, page(&[(2, "B")], false))
    );
    assert!(matches!(outcome, FetchOutcome::Merged { exhausted: true, .. }));

    for _ in 0..3 {
        assert!(matches!(
            controller.request_more().await,
            FetchOutcome::Skipped(SkipReason::Exhausted)
        ));
        assert!(!controller.is_pending());
    }
    assert_eq!(gated.calls(), 1);
}

#[tokio::test]
async fn failed_fetch_can_be_retried() {
    let gated = Gated::default();
    let controller = listing(&gated, vec![(1, "A")], true);

    let (failed, _) = tokio::join!(
        controller.request_more(),
        gated.release("all", 2, Err(FetchError::Status(503)))
    );
    assert!(matches!(failed, FetchOutcome::Failed(FetchError::Status(503))));
    assert_eq!(ids(&controller), vec![1]);
    assert_eq!(controller.current_page(), 1);

    let (retried, _) = tokio::join!(
        controller.request_more(),
        gated.release("all", 2, page(&[(2, "B")], true))
    );
    assert!(retried.is_merged());
    assert_eq!(ids(&controller), vec![1, 2]);
}

#[tokio::test]
async fn close_abandons_in_flight_fetch() {
    let gated = Gated::default();
    let controller = listing(&gated, vec![(1, "A")], true);

    let (outcome, _) = tokio::join!(controller.request_more(), async {
        gated.wait_for("all", 2).await;
        controller.close();
    });

    assert!(matches!(outcome, FetchOutcome::Stale));
    assert_eq!(ids(&controller), vec![1]);
    assert!(!controller.is_pending());
}

#[tokio::test]
async fn old_page_after_filter_change_is_discarded() {
    let gated = Gated::default();
    let controller = Arc::new(FilterQueryController::keyed(
        gated.clone(),
        "all".to_string(),
        |item: &Item| item.0,
    ));

    let (mounted, _) = tokio::join!(
        controller.mount(),
        gated.release("all", 1, page(&[(1, "A"), (2, "B")], true))
    );
    assert!(mounted.is_merged());

    // page 2 of the old filter set is in flight when the filters change
    let old_page = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.request_more().await }
    });
    gated.wait_for("all", 2).await;

    let new_first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.set_filters("action".to_string()).await }
    });
    gated.wait_for("action", 1).await;

    gated
        .release("action", 1, page(&[(10, "X"), (11, "Y")], true))
        .await;
    let new_first = new_first.await.unwrap();
    assert!(matches!(new_first, FetchOutcome::Merged { page: 1, added: 2, .. }));

    // the old response shows up last and must change nothing
    gated
        .release("all", 2, page(&[(3, "C"), (4, "D")], false))
        .await;
    let old_page = old_page.await.unwrap();
    assert!(matches!(old_page, FetchOutcome::Stale));

    let snapshot = controller.sequence().snapshot();
    let keys: Vec<_> = snapshot.items.iter().map(|item| item.0).collect();
    assert_eq!(keys, vec![10, 11]);
    assert_eq!(snapshot.current_page, 1);
    assert!(!snapshot.exhausted);
    assert!(!snapshot.pending);
}

#[tokio::test]
async fn rapid_filter_changes_keep_only_the_last() {
    let gated = Gated::default();
    let controller = Arc::new(FilterQueryController::keyed(
        gated.clone(),
        "all".to_string(),
        |item: &Item| item.0,
    ));

    let mut tasks = Vec::new();
    for filters in ["a", "ab", "abc"] {
        let controller = Arc::clone(&controller);
        tasks.push(tokio::spawn(async move {
            controller.set_filters(filters.to_string()).await
        }));
        gated.wait_for(filters, 1).await;
    }

    // answer in reverse order of issue
    gated.release("abc", 1, page(&[(3, "abc")], false)).await;
    gated.release("ab", 1, page(&[(2, "ab")], false)).await;
    gated.release("a", 1, page(&[(1, "a")], false)).await;

    let outcomes: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();
    assert!(matches!(outcomes[0], FetchOutcome::Stale));
    assert!(matches!(outcomes[1], FetchOutcome::Stale));
    assert!(outcomes[2].is_merged());

    assert_eq!(controller.filters(), "abc");
    let keys: Vec<_> = controller
        .sequence()
        .with_items(|items| items.iter().map(|item| item.0).collect());
    assert_eq!(keys, vec![3]);
}

#[tokio::test]
async fn dropped_trigger_leaves_sequence_retryable() {
    let gated = Gated::default();
    let controller = listing(&gated, vec![(1, "A")], true);

    // the caller gives up once the fetch is on the wire
    tokio::select! {
        _ = controller.request_more() => panic!("fetch was never answered"),
        _ = gated.wait_for("all", 2) => {}
    }
    assert!(!controller.is_pending());
    assert_eq!(controller.current_page(), 1);
    assert_eq!(ids(&controller), vec![1]);

    let (retried, _) = tokio::join!(
        controller.request_more(),
        gated.release("all", 2, page(&[(2, "B")], true))
    );
    assert!(matches!(retried, FetchOutcome::Merged { page: 2, added: 1, .. }));
    assert_eq!(ids(&controller), vec![1, 2]);
    assert_eq!(gated.calls(), 2);
}

#[tokio::test]
async fn dropped_mount_can_be_mounted_again() {
    let gated = Gated::default();
    let controller = FilterQueryController::keyed(gated.clone(), "all".to_string(), |item: &Item| item.0);

    tokio::select! {
        _ = controller.mount() => panic!("first page was never answered"),
        _ = gated.wait_for("all", 1) => {}
    }
    assert!(controller.is_mounted());
    assert!(!controller.sequence().is_pending());

    let (mounted, _) = tokio::join!(
        controller.mount(),
        gated.release("all", 1, page(&[(1, "A")], true))
    );
    assert!(matches!(mounted, FetchOutcome::Merged { page: 1, added: 1, .. }));
    assert_eq!(ids(controller.sequence()), vec![1]);
}

#[tokio::test]
async fn dropped_filter_change_recovers_on_next_trigger() {
    let gated = Gated::default();
    let controller = FilterQueryController::keyed(gated.clone(), "all".to_string(), |item: &Item| item.0);

    let (mounted, _) = tokio::join!(
        controller.mount(),
        gated.release("all", 1, page(&[(1, "A")], true))
    );
    assert!(mounted.is_merged());

    tokio::select! {
        _ = controller.set_filters("drama".to_string()) => panic!("first page was never answered"),
        _ = gated.wait_for("drama", 1) => {}
    }
    assert_eq!(controller.filters(), "drama");
    assert!(!controller.sequence().is_pending());
    assert!(controller.sequence().is_empty());

    // same filters again: nothing to restart, but the sequence is not stuck
    let repeated = controller.set_filters("drama".to_string()).await;
    assert!(matches!(repeated, FetchOutcome::Skipped(SkipReason::Unchanged)));

    let (loaded, _) = tokio::join!(
        controller.request_more(),
        gated.release("drama", 1, page(&[(7, "D")], false))
    );
    assert!(matches!(loaded, FetchOutcome::Merged { page: 1, exhausted: true, .. }));
    assert_eq!(ids(controller.sequence()), vec![7]);
}
