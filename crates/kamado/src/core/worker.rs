//! Lifecycle of the background batching task.

use std::future::Future;
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use tokio::{task::JoinHandle, sync::Notify};

/// The worker's view of its own lifecycle.
///
/// Handed to the task when it is spawned; the task polls [`is_running`] between
/// batches and races [`stopped`] against its idle wait.
///
/// [`is_running`]: WorkerSignal::is_running
/// [`stopped`]: WorkerSignal::stopped
#[derive(Clone)]
pub struct WorkerSignal {
    running: Arc<AtomicBool>,
    notifier: Arc<Notify>,
}

impl WorkerSignal {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// A signal that is never stopped, for driving a task without a handle.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            notifier: Arc::new(Notify::new()),
        }
    }

    /// Resolves once shutdown has been requested.
    pub async fn stopped(&self) {
        while self.is_running() {
            self.notifier.notified().await;
        }
    }
}

/// A handle owning the background batching task.
///
/// Dropping the handle requests shutdown; the task finishes its current batch
/// and then exits on its own.
///
/// # Example
///
/// ```ignore
/// let worker = WorkerHandle::spawn(|signal| async move {
///     loop {
///         tokio::select! {
///             _ = signal.stopped() => break,
///             _ = tokio::time::sleep(Duration::from_millis(10)) => run_one_batch().await,
///         }
///     }
/// });
/// ```
pub struct WorkerHandle {
    signal: WorkerSignal,

    /// `None` once shutdown has taken it
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawns `task` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// When called outside a tokio runtime.
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(WorkerSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let signal = WorkerSignal {
            running: Arc::new(AtomicBool::new(true)),
            notifier: Arc::new(Notify::new()),
        };
        let handle = tokio::spawn(task(signal.clone()));

        Self {
            signal,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.signal.is_running()
    }

    /// Requests shutdown and returns the task handle, if not already taken.
    ///
    /// Idempotent: later calls only return `None`.
    pub fn shutdown(&mut self) -> Option<JoinHandle<()>> {
        self.signal.running.store(false, Ordering::SeqCst);
        // notify_one stores a permit, so a task that is not parked yet still wakes
        self.signal.notifier.notify_one();
        self.handle.take()
    }

    /// Requests shutdown and waits for the task to exit.
    pub async fn join(mut self) {
        if let Some(handle) = self.shutdown() {
            if let Err(err) = handle.await {
                log::error!("batching worker terminated abnormally: {err}");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // the detached task observes the flag and winds down by itself
        let _ = self.shutdown();
    }
}
