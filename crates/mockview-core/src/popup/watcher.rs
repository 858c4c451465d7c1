//! Closure watcher: polls a popup until it closes, then runs a callback once.
//!
//! The timer is a tokio interval, so tests drive it with paused time
//! (`#[tokio::test(start_paused = true)]`) instead of a wall clock.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::launcher::PopupWindow;
use super::DEFAULT_POLL_INTERVAL;

pub type CloseFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Completion callback, invoked at most once per session.
pub type OnClose = Box<dyn FnOnce() -> CloseFuture + Send + 'static>;

/// Box an async closure as an [`OnClose`] callback.
pub fn on_close<F, Fut>(f: F) -> OnClose
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// Who currently holds the window.
enum Slot<W> {
    Open(W),
    /// Closure observed or cleanup ran; the handle is gone.
    Done,
}

enum Poll {
    Open,
    Closed,
    Stopped,
}

fn lock<W>(slot: &Mutex<Slot<W>>) -> MutexGuard<'_, Slot<W>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn poll_once<W: PopupWindow>(slot: &Mutex<Slot<W>>) -> Poll {
    let mut guard = lock(slot);
    let closed = match &mut *guard {
        Slot::Open(window) => window.is_closed(),
        Slot::Done => return Poll::Stopped,
    };
    if closed {
        *guard = Slot::Done;
        Poll::Closed
    } else {
        Poll::Open
    }
}

/// Registers polling timers for popup windows.
#[derive(Debug, Clone, Copy)]
pub struct ClosureWatcher {
    interval: Duration,
}

impl Default for ClosureWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ClosureWatcher {
    /// A zero interval is raised to 1ms; tokio intervals cannot have a zero period.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `window`. The first check happens one interval from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn watch<W: PopupWindow>(&self, window: W, on_close: OnClose) -> PopupSession<W> {
        let slot = Arc::new(Mutex::new(Slot::Open(window)));
        let interval = self.interval;
        let task_slot = Arc::clone(&slot);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick: u64 = 0;

            loop {
                ticker.tick().await;
                tick += 1;
                match poll_once(&task_slot) {
                    Poll::Open => tracing::trace!(tick, "checkout popup still open"),
                    Poll::Stopped => return,
                    Poll::Closed => {
                        tracing::info!(tick, "checkout popup closed");
                        break;
                    }
                }
            }

            // Polling has stopped before the callback runs; a panic here
            // reaches whoever awaits `PopupSession::finished`.
            on_close().await;
        });

        PopupSession {
            slot,
            abort: task.abort_handle(),
            task: Some(task),
        }
    }
}

/// One open popup and the timer watching it.
///
/// Dropping the session leaves the watcher running; call
/// [`cleanup`](Self::cleanup) to stop it.
pub struct PopupSession<W: PopupWindow> {
    slot: Arc<Mutex<Slot<W>>>,
    abort: AbortHandle,
    /// Taken once the watcher task has been joined.
    task: Option<JoinHandle<()>>,
}

impl<W: PopupWindow> PopupSession<W> {
    /// Whether the watcher still holds an open window.
    pub fn is_watching(&self) -> bool {
        matches!(*lock(&self.slot), Slot::Open(_))
    }

    /// Stop polling and force-close the popup if it is still open.
    ///
    /// The completion callback does not run. Calling this after the popup
    /// closed on its own, or more than once, does nothing.
    pub fn cleanup(&self) {
        let mut guard = lock(&self.slot);
        if let Slot::Open(mut window) = std::mem::replace(&mut *guard, Slot::Done) {
            self.abort.abort();
            if !window.is_closed() {
                window.close();
            }
            tracing::debug!("checkout popup session cleaned up");
        }
    }

    /// Wait until the watcher stops, either after the callback completed or
    /// after cleanup. A panic inside the callback is resumed here.
    ///
    /// Cancel-safe: dropping the future leaves the session intact, so this
    /// can race against a cancellation signal that then calls `cleanup`.
    pub async fn finished(&mut self) {
        let Some(task) = self.task.as_mut() else {
            return;
        };
        let result = task.await;
        self.task = None;
        if let Err(err) = result {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Probe {
        polls: AtomicUsize,
        closed: AtomicBool,
        close_calls: AtomicUsize,
        /// Report closed starting with this poll (1-based).
        closes_on_poll: Option<usize>,
    }

    struct FakeWindow(Arc<Probe>);

    impl PopupWindow for FakeWindow {
        fn is_closed(&mut self) -> bool {
            let n = self.0.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.0.closes_on_poll.is_some_and(|at| n >= at) {
                self.0.closed.store(true, Ordering::SeqCst);
            }
            self.0.closed.load(Ordering::SeqCst)
        }

        fn close(&mut self) {
            self.0.close_calls.fetch_add(1, Ordering::SeqCst);
            self.0.closed.store(true, Ordering::SeqCst);
        }
    }

    fn counting_callback(counter: &Arc<AtomicUsize>) -> OnClose {
        let counter = Arc::clone(counter);
        on_close(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn sleep_ms(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn callback_fires_once_on_first_closed_poll() {
        let probe = Arc::new(Probe {
            closes_on_poll: Some(2),
            ..Probe::default()
        });
        let fired = Arc::new(AtomicUsize::new(0));
        let session = ClosureWatcher::default()
            .watch(FakeWindow(Arc::clone(&probe)), counting_callback(&fired));

        sleep_ms(1500).await;
        assert_eq!(probe.polls.load(Ordering::SeqCst), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(session.is_watching());

        sleep_ms(1000).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!session.is_watching());

        sleep_ms(10_000).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(probe.polls.load(Ordering::SeqCst), 2);
        assert_eq!(probe.close_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_while_open_closes_window_without_callback() {
        let probe = Arc::new(Probe::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let mut session = ClosureWatcher::default()
            .watch(FakeWindow(Arc::clone(&probe)), counting_callback(&fired));

        sleep_ms(1500).await;
        session.cleanup();

        assert_eq!(probe.close_calls.load(Ordering::SeqCst), 1);
        assert!(probe.closed.load(Ordering::SeqCst));
        assert!(!session.is_watching());

        let polls = probe.polls.load(Ordering::SeqCst);
        sleep_ms(10_000).await;
        assert_eq!(probe.polls.load(Ordering::SeqCst), polls);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        session.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_after_callback_is_a_no_op() {
        let probe = Arc::new(Probe {
            closes_on_poll: Some(1),
            ..Probe::default()
        });
        let fired = Arc::new(AtomicUsize::new(0));
        let mut session = ClosureWatcher::default()
            .watch(FakeWindow(Arc::clone(&probe)), counting_callback(&fired));

        sleep_ms(1500).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        session.cleanup();
        session.cleanup();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(probe.close_calls.load(Ordering::SeqCst), 0);

        session.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn custom_interval_controls_detection_latency() {
        let probe = Arc::new(Probe {
            closes_on_poll: Some(1),
            ..Probe::default()
        });
        let fired = Arc::new(AtomicUsize::new(0));
        let _session = ClosureWatcher::new(Duration::from_millis(250))
            .watch(FakeWindow(Arc::clone(&probe)), counting_callback(&fired));

        sleep_ms(200).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        sleep_ms(100).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_have_independent_timers() {
        let first = Arc::new(Probe::default());
        let second = Arc::new(Probe {
            closes_on_poll: Some(1),
            ..Probe::default()
        });
        let fired_first = Arc::new(AtomicUsize::new(0));
        let fired_second = Arc::new(AtomicUsize::new(0));
        let watcher = ClosureWatcher::default();

        let a = watcher.watch(FakeWindow(Arc::clone(&first)), counting_callback(&fired_first));
        let _b = watcher.watch(FakeWindow(Arc::clone(&second)), counting_callback(&fired_second));

        sleep_ms(1500).await;
        assert_eq!(fired_first.load(Ordering::SeqCst), 0);
        assert_eq!(fired_second.load(Ordering::SeqCst), 1);

        a.cleanup();
        assert_eq!(first.close_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.close_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "refresh exploded")]
    async fn callback_panic_surfaces_through_finished() {
        let probe = Arc::new(Probe {
            closes_on_poll: Some(1),
            ..Probe::default()
        });
        let mut session = ClosureWatcher::default().watch(
            FakeWindow(probe),
            on_close(|| async { panic!("refresh exploded") }),
        );

        session.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_still_allows_cleanup() {
        let probe = Arc::new(Probe::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let mut session = ClosureWatcher::default()
            .watch(FakeWindow(Arc::clone(&probe)), counting_callback(&fired));

        tokio::select! {
            _ = session.finished() => panic!("popup never closed"),
            _ = sleep_ms(3500) => session.cleanup(),
        }

        session.finished().await;
        session.finished().await;
        assert_eq!(probe.close_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
