use log::debug;
use shared::filter::Merge;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct DebounceState<T> {
    pending: Option<T>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every push so a timer that already woke up can tell it was
    /// superseded.
    generation: u64,
}

/// Collapses bursts of edits into one merged update per quiet window.
///
/// Every `push` restarts the window. When it elapses without another push,
/// the merged value is sent on the channel returned by [`Debouncer::new`].
/// Must be used inside a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    state: Arc<Mutex<DebounceState<T>>>,
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Debouncer<T>
where
    T: Merge + Send + 'static,
{
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            delay,
            state: Arc::new(Mutex::new(DebounceState {
                pending: None,
                timer: None,
                generation: 0,
            })),
            tx,
        };
        (debouncer, rx)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn lock(&self) -> MutexGuard<'_, DebounceState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merges `update` into the pending value and restarts the quiet window.
    pub fn push(&self, update: T) {
        let mut state = self.lock();
        match state.pending.as_mut() {
            Some(pending) => pending.merge(update),
            None => state.pending = Some(update),
        }
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let tx = self.tx.clone();
        let delay = self.delay;
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Sent under the lock so a concurrent flush cannot overtake it.
            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation != generation {
                return;
            }
            state.timer = None;
            if let Some(update) = state.pending.take() {
                debug!("Quiet window of {:?} elapsed, dispatching", delay);
                // The receiver is gone once its controller shut down.
                let _ = tx.send(update);
            }
        }));
    }

    /// Sends the pending value now. Returns whether there was one.
    pub fn flush(&self) -> bool {
        let mut state = self.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
        match state.pending.take() {
            Some(update) => {
                debug!("Flushing pending update");
                self.tx.send(update).is_ok()
            }
            None => false,
        }
    }

    /// Drops the pending value and its timer.
    pub fn cancel(&self) {
        let mut state = self.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
        if state.pending.take().is_some() {
            debug!("Cancelled pending update");
        }
    }

    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared::filter::{FilterPatch, FilterValue};
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::time::{advance, sleep};

    const WINDOW: Duration = Duration::from_millis(400);

    #[tokio::test(start_paused = true)]
    async fn test_burst_yields_one_merged_dispatch() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);

        for prefix in ["j", "jo", "jor", "jord", "jordan"] {
            debouncer.push(FilterPatch::new().text("customer", prefix));
            sleep(Duration::from_millis(100)).await;
        }
        debouncer.push(FilterPatch::new().choice("status", "pending"));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        sleep(WINDOW + Duration::from_millis(1)).await;
        let merged = rx.try_recv().unwrap();
        assert_eq!(
            merged.get("customer"),
            Some(&Some(FilterValue::Text("jordan".into())))
        );
        assert_eq!(
            merged.get("status"),
            Some(&Some(FilterValue::Choice("pending".into())))
        );

        sleep(WINDOW * 3).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(!debouncer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_dispatch_separately() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);

        debouncer.push(FilterPatch::new().text("team", "hawks"));
        sleep(WINDOW * 2).await;
        debouncer.push(FilterPatch::new().text("team", "eagles"));
        sleep(WINDOW * 2).await;

        assert_eq!(
            rx.try_recv().unwrap().get("team"),
            Some(&Some(FilterValue::Text("hawks".into())))
        );
        assert_eq!(
            rx.try_recv().unwrap().get("team"),
            Some(&Some(FilterValue::Text("eagles".into())))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_dispatches_immediately_and_once() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);

        debouncer.push(FilterPatch::new().text("customer", "lee"));
        assert!(debouncer.flush());
        assert!(rx.try_recv().is_ok());
        assert!(!debouncer.flush());

        advance(WINDOW * 2).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timer_and_flush_dispatch_in_push_order() {
        let (debouncer, mut rx) = Debouncer::new(Duration::from_millis(1));

        for n in 0..200u32 {
            debouncer.push(FilterPatch::new().text("customer", &n.to_string()));
            if n % 2 == 0 {
                sleep(Duration::from_millis(1)).await;
            } else {
                debouncer.flush();
            }
        }
        debouncer.flush();
        drop(debouncer);

        let mut seen = Vec::new();
        while let Some(patch) = rx.recv().await {
            if let Some(Some(value)) = patch.get("customer") {
                seen.push(value.as_str().parse::<u32>().unwrap());
            }
        }
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]), "out of order: {:?}", seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_abort_dispatch() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);
        debouncer.push(FilterPatch::new().text("customer", "x"));
        debouncer.cancel();
        sleep(WINDOW * 2).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        debouncer.push(FilterPatch::new().text("customer", "y"));
        drop(debouncer);
        sleep(WINDOW * 2).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }
}
