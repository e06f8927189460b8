// ── Resource poller ──
//
// Keeps one named view of backend state fresh. A background task fetches
// once on start and then once per interval tick, replacing the whole
// snapshot each time. Fetches run as independent tasks, so a slow response
// can land after a faster, later one: results apply in arrival order.
//
// Cancellation is cooperative. `stop()` cancels the token and then takes
// the state lock once, so any result still in flight finds the token
// cancelled when it gets there and is dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;

/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

type FetchFn<P, T> = dyn Fn(P) -> BoxFuture<'static, Result<T, CoreError>> + Send + Sync;

// ── Snapshot ─────────────────────────────────────────────────────────

/// What a poller currently knows.
#[derive(Debug)]
pub struct PollState<T> {
    /// Latest successful response. Survives later failures.
    pub data: Option<Arc<T>>,
    /// Message from the most recent fetch if it failed; cleared on success.
    pub error: Option<String>,
    /// When `data` was last replaced.
    pub updated_at: Option<DateTime<Utc>>,
    /// Count of applied fetch results, successful or not.
    pub generation: u64,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            updated_at: None,
            generation: 0,
        }
    }
}

impl<T> Clone for PollState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
            generation: self.generation,
        }
    }
}

impl<T> PollState<T> {
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }
}

// ── Refresh trigger ──────────────────────────────────────────────────

/// Cloneable "fetch now" button for a running poller.
///
/// Firing while a fetch is already queued coalesces into one fetch.
#[derive(Clone)]
pub struct RefreshTrigger(Arc<Notify>);

impl RefreshTrigger {
    pub fn fire(&self) {
        self.0.notify_one();
    }
}

// ── Builder ──────────────────────────────────────────────────────────

/// A not-yet-started poller: fetch operation, cadence, and initial params.
pub struct ResourcePoller<P, T> {
    name: Arc<str>,
    interval: Duration,
    debounce: Duration,
    params: P,
    fetch: Arc<FetchFn<P, T>>,
}

impl<P, T> ResourcePoller<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new<F, Fut>(name: impl Into<Arc<str>>, interval: Duration, params: P, fetch: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            interval,
            debounce: Duration::from_millis(500),
            params,
            fetch: Arc::new(move |params: P| -> BoxFuture<'static, Result<T, CoreError>> {
                Box::pin(fetch(params))
            }),
        }
    }

    /// Quiet period applied to [`PollerHandle::set_params`].
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Spawn the poll task on the current tokio runtime. The first fetch
    /// is issued immediately.
    pub fn start(self) -> PollerHandle<P, T> {
        let (state, _) = watch::channel(PollState::default());
        let state = Arc::new(state);
        let (params_tx, params_rx) = watch::channel(self.params);
        let trigger = RefreshTrigger(Arc::new(Notify::new()));
        let cancel = CancellationToken::new();

        let task = PollTask {
            name: Arc::clone(&self.name),
            fetch: self.fetch,
            state: Arc::clone(&state),
            cancel: cancel.clone(),
        };
        let join = tokio::spawn(task.run(
            self.interval.max(MIN_INTERVAL),
            self.debounce,
            params_rx,
            trigger.clone(),
        ));

        debug!(poller = %self.name, interval = ?self.interval, "poller started");

        PollerHandle {
            name: self.name,
            state,
            params: params_tx,
            trigger,
            cancel,
            task: Some(join),
        }
    }
}

// ── Background task ──────────────────────────────────────────────────

struct PollTask<P, T> {
    name: Arc<str>,
    fetch: Arc<FetchFn<P, T>>,
    state: Arc<watch::Sender<PollState<T>>>,
    cancel: CancellationToken,
}

impl<P, T> PollTask<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    async fn run(
        self,
        period: Duration,
        debounce: Duration,
        mut params: watch::Receiver<P>,
        trigger: RefreshTrigger,
    ) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut pending_params: Option<Instant> = None;
        // Params that have outlived the debounce window. Scheduled and
        // manual fetches use these, never a value still being edited.
        let mut applied = params.borrow_and_update().clone();

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.spawn_fetch(applied.clone());
                }
                () = trigger.0.notified() => {
                    debug!(poller = %self.name, "refresh requested");
                    self.spawn_fetch(applied.clone());
                }
                changed = params.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    pending_params = Some(Instant::now() + debounce);
                }
                () = tokio::time::sleep_until(pending_params.unwrap_or_else(Instant::now)),
                    if pending_params.is_some() =>
                {
                    pending_params = None;
                    interval.reset();
                    applied = params.borrow_and_update().clone();
                    self.spawn_fetch(applied.clone());
                }
            }
        }

        debug!(poller = %self.name, "poller stopped");
    }

    fn spawn_fetch(&self, params: P) {
        let fetch = Arc::clone(&self.fetch);
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let name = Arc::clone(&self.name);

        tokio::spawn(async move {
            let result = fetch(params).await;
            apply(&state, &cancel, &name, result);
        });
    }
}

/// Publish one fetch result, unless the poller was stopped meanwhile.
fn apply<T>(
    state: &watch::Sender<PollState<T>>,
    cancel: &CancellationToken,
    name: &str,
    result: Result<T, CoreError>,
) {
    state.send_if_modified(move |snapshot| {
        // Checked under the state lock; see `PollerHandle::stop`.
        if cancel.is_cancelled() {
            debug!(poller = %name, "discarding result from stopped poller");
            return false;
        }
        match result {
            Ok(data) => {
                snapshot.data = Some(Arc::new(data));
                snapshot.error = None;
                snapshot.updated_at = Some(Utc::now());
            }
            Err(e) => {
                warn!(poller = %name, error = %e, "fetch failed, keeping previous snapshot");
                snapshot.error = Some(e.to_string());
            }
        }
        snapshot.generation += 1;
        true
    });
}

// ── Handle ───────────────────────────────────────────────────────────

/// Owner-side control of a running poller. Dropping it stops the poller.
pub struct PollerHandle<P, T> {
    name: Arc<str>,
    state: Arc<watch::Sender<PollState<T>>>,
    params: watch::Sender<P>,
    trigger: RefreshTrigger,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<P, T> PollerHandle<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PollState<T> {
        self.state.borrow().clone()
    }

    /// Stream of snapshots, starting with the current one.
    pub fn updates(&self) -> WatchStream<PollState<T>> {
        WatchStream::new(self.state.subscribe())
    }

    /// Fetch now, outside the regular schedule.
    pub fn refresh(&self) {
        self.trigger.fire();
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    /// Replace the fetch parameters. The fetch happens once the params
    /// have been stable for the debounce window; only the last value set
    /// within the window is used.
    pub fn set_params(&self, params: P) {
        self.params.send_replace(params);
    }

    pub fn params(&self) -> P {
        self.params.borrow().clone()
    }

    /// Stop polling. Once this returns the snapshot will not change again,
    /// even if a fetch issued earlier resolves later.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        // Barrier: wait out any `apply` that checked the token before we set it.
        self.state.send_if_modified(|_| false);
        debug!(poller = %self.name, "poller stop requested");
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the background task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(poller = %self.name, error = %e, "poll task ended abnormally");
            }
        }
    }
}

impl<P, T> Drop for PollerHandle<P, T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;
    use tokio::sync::{mpsc, oneshot};

    use super::*;

    fn counting_poller(
        interval: Duration,
    ) -> (ResourcePoller<(), u32>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let poller = ResourcePoller::new("count", interval, (), move |()| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(n) }
        });
        (poller, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_every_tick() {
        let (poller, calls) = counting_poller(Duration::from_secs(5));
        let handle = poller.start();
        let mut rx = handle.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().data.as_deref(), Some(&1));

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(handle.snapshot().data.as_deref(), Some(&2));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_snapshot_and_keeps_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handle = ResourcePoller::new("flaky", Duration::from_secs(1), (), move |()| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 1 {
                    Err(CoreError::Network {
                        reason: "connection refused".into(),
                    })
                } else {
                    Ok(vec![n])
                }
            }
        })
        .start();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let snap = handle.snapshot();
        assert_eq!(snap.data.as_deref(), Some(&vec![0]));
        assert!(snap.error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(snap.generation, 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let snap = handle.snapshot();
        assert_eq!(snap.data.as_deref(), Some(&vec![2]));
        assert!(snap.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_poller_ignores_late_result() {
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(Mutex::new(Some(release_rx)));

        let handle = ResourcePoller::new("slow", Duration::from_secs(60), (), move |()| {
            let started = started_tx.clone();
            let gate = release_rx.lock().unwrap().take();
            async move {
                let _ = started.send(());
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok("late")
            }
        })
        .start();

        started_rx.recv().await.unwrap();
        handle.stop();
        release_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snap = handle.snapshot();
        assert!(snap.data.is_none());
        assert_eq!(snap.generation, 0);
        assert!(handle.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn results_apply_in_arrival_order() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handle = ResourcePoller::new("race", Duration::from_secs(1), (), move |()| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    // Issued first, lands last.
                    0 => tokio::time::sleep(Duration::from_millis(2_500)).await,
                    1 => {}
                    _ => std::future::pending::<()>().await,
                }
                Ok(n)
            }
        })
        .start();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(handle.snapshot().data.as_deref(), Some(&1));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.snapshot().data.as_deref(), Some(&0));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_fetches_out_of_schedule() {
        let (poller, calls) = counting_poller(Duration::from_secs(3600));
        let handle = poller.start();
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();

        handle.trigger().fire();
        rx.changed().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(rx.borrow().data.as_deref(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn param_changes_are_debounced_to_the_last_value() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let handle = ResourcePoller::new(
            "search",
            Duration::from_secs(3600),
            String::new(),
            move |query: String| {
                log.lock().unwrap().push(query.clone());
                async move { Ok(query) }
            },
        )
        .debounce(Duration::from_millis(500))
        .start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.set_params("n".into());
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.set_params("ng".into());
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.set_params("nginx".into());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(seen.lock().unwrap().len(), 1, "still inside the window");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*seen.lock().unwrap(), vec![String::new(), "nginx".to_owned()]);
        assert_eq!(handle.snapshot().data.as_deref().map(String::as_str), Some("nginx"));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_inside_debounce_window_uses_settled_params() {
        let start = Instant::now();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let handle = ResourcePoller::new(
            "search",
            Duration::from_secs(1),
            String::new(),
            move |query: String| {
                log.lock().unwrap().push((start.elapsed(), query.clone()));
                async move { Ok(query) }
            },
        )
        .debounce(Duration::from_millis(500))
        .start();

        tokio::time::sleep(Duration::from_millis(900)).await;
        handle.set_params("ngi".into());
        tokio::time::sleep(Duration::from_millis(600)).await;

        let fetched = seen.lock().unwrap().clone();
        let queries: Vec<&str> = fetched.iter().map(|(_, q)| q.as_str()).collect();
        assert_eq!(queries, vec!["", "", "ngi"], "the 1s tick fetched the old query");
        let (at, _) = fetched[2];
        assert!(at >= Duration::from_millis(1_400), "fetched 'ngi' after {at:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn updates_stream_starts_with_current_snapshot() {
        let (poller, _calls) = counting_poller(Duration::from_secs(3600));
        let handle = poller.start();
        let mut updates = handle.updates();

        let first = updates.next().await.unwrap();
        let first = if first.is_loaded() {
            first
        } else {
            updates.next().await.unwrap()
        };
        assert_eq!(first.data.as_deref(), Some(&1));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_polling() {
        let (poller, calls) = counting_poller(Duration::from_secs(1));
        let handle = poller.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
