//! Scoped single-shot timers.
//!
//! Every timer a wizard starts is registered here so teardown can cancel the
//! ones that have not fired yet. Dropping the registry cancels them too.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Default)]
pub struct TimerRegistry {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` once after `delay`. Must be called inside a Tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
    }

    fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) {
        let handle = tokio::spawn(task);
        let mut handles = self.handles.lock().expect("timer registry lock poisoned");
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .expect("timer registry lock poisoned")
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Aborts every outstanding timer.
    pub fn cancel_all(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().expect("timer registry lock poisoned"));
        let outstanding = handles.iter().filter(|handle| !handle.is_finished()).count();
        for handle in handles {
            handle.abort();
        }
        if outstanding > 0 {
            debug!(outstanding, "cancelled pending wizard timers");
        }
    }

    /// Waits until every registered timer has fired or been cancelled.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().expect("timer registry lock poisoned"));
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        if let Ok(handles) = self.handles.get_mut() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }
}
