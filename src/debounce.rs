//! Trailing-edge debounce boundary
//!
//! Each query owns one [`Debouncer`]. Scheduling restarts the quiet period;
//! only the last scheduled action runs, once the window elapses with no
//! further calls. The action runs synchronously on the timer task and the
//! debouncer reports pending until it returns, so anything long-lived it
//! starts must be spawned by the action itself: cancelling a debouncer only
//! ever drops a sleeping timer, never work already in progress.
//!
//! An optional [`Notify`] is woken once the debouncer stops being pending,
//! after the action has returned or the timer was cancelled.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Default quiet period before a load executes
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct DebounceState {
    /// Bumped by every schedule/cancel; a timer only fires for its own generation
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    state: Mutex<DebounceState>,
    idle: Option<Arc<Notify>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(DebounceState::default()),
            idle: None,
        }
    }

    /// Wake `idle` whenever the debouncer stops being pending
    pub fn with_notify(mut self, idle: Arc<Notify>) -> Self {
        self.idle = Some(idle);
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending action with `fire`, restarting the window
    ///
    /// The timer task runs on `runtime`, so this may be called from any thread.
    pub fn schedule<F>(self: &Arc<Self>, runtime: &Handle, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        state.generation += 1;
        let generation = state.generation;
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }

        let this = Arc::clone(self);
        let window = self.window;
        state.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if this.state.lock().generation != generation {
                return;
            }
            fire();
            // Stays pending until the action has returned
            let cleared = {
                let mut state = this.state.lock();
                state.generation == generation && state.pending.take().is_some()
            };
            if cleared {
                this.wake_idle();
            }
        }));
    }

    /// Drop the pending action, if any
    pub fn cancel(&self) {
        let dropped = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.pending.take()
        };
        if let Some(handle) = dropped {
            handle.abort();
            self.wake_idle();
        }
    }

    /// Whether an action is waiting for its window to elapse
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    fn wake_idle(&self) {
        if let Some(idle) = &self.idle {
            idle.notify_waiters();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().pending.take() {
            handle.abort();
        }
    }
}
