//! Trailing-edge debouncing of rapid input changes.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Coalesces values pushed in quick succession
///
/// Every push restarts the quiet-period timer; once `delay` passes without a
/// new value, the handler is spawned with the last value only. Handlers run
/// concurrently with later input, so a handler for an older value may still
/// be running when a newer one starts.
pub struct Debouncer<T> {
    tx: Option<mpsc::UnboundedSender<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(delay: Duration, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, delay, handler));
        Self {
            tx: Some(tx),
            task: Some(task),
        }
    }

    /// Queue a value; false once the debouncer has shut down
    pub fn push(&self, value: T) -> bool {
        match &self.tx {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Stop accepting input, fire any value still waiting out its quiet
    /// period, and wait for the last handler to finish
    pub async fn finish(mut self) {
        self.tx.take();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

async fn run<T, F, Fut>(mut rx: mpsc::UnboundedReceiver<T>, delay: Duration, handler: F)
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut last_handler: Option<JoinHandle<()>> = None;

    while let Some(mut latest) = rx.recv().await {
        let mut closed = false;
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(value) => {
                        trace!("Debounce timer restarted");
                        latest = value;
                    }
                    None => {
                        closed = true;
                        break;
                    }
                },
                _ = tokio::time::sleep(delay) => break,
            }
        }

        last_handler = Some(tokio::spawn(handler(latest)));
        if closed {
            break;
        }
    }

    if let Some(handle) = last_handler {
        let _ = handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<&'static str>>>;

    fn recorder() -> (Seen, impl Fn(&'static str) -> std::future::Ready<()> + Send + 'static) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |value: &'static str| {
            sink.lock().unwrap().push(value);
            std::future::ready(())
        };
        (seen, handler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_value_in_quiet_period_fires() {
        let (seen, handler) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(300), handler);

        debouncer.push("n");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.push("na");
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.push("nar");
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["nar"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let (seen, handler) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(300), handler);

        debouncer.push("first");
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.push("second");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_flushes_pending_value() {
        let (seen, handler) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(300), handler);

        debouncer.push("a");
        debouncer.push("ab");
        debouncer.finish().await;

        assert_eq!(*seen.lock().unwrap(), vec!["ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_discards_pending_value() {
        let (seen, handler) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(300), handler);

        debouncer.push("gone");
        drop(debouncer);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(seen.lock().unwrap().is_empty());
    }
}
