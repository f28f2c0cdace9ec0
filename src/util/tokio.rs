use log::{debug, warn};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A background task that runs `work`, waits `interval` and repeats until
/// stopped.
///
/// Cancellation is only observed between iterations, so an iteration that
/// is already running is never interrupted. Once stopped a `Repeating`
/// cannot be started again; spawn a new one instead.
pub struct Repeating {
    name: &'static str,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Repeating {
    /// Spawn the loop on the current tokio runtime. Cancelling `parent` stops
    /// the loop as well.
    pub fn spawn<F, Fut>(
        name: &'static str,
        interval: Duration,
        parent: &CancellationToken,
        mut work: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            debug!("{name} started with interval {interval:?}.");
            while !cancelled.is_cancelled() {
                work().await;
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!("{name} stopped.");
        });

        Self {
            name,
            token,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the loop and wait for the current iteration to finish.
    pub async fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("{} terminated abnormally. [{}]", self.name, e);
                }
            }
        }
    }
}

impl Drop for Repeating {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[derive(Default)]
struct Tasks {
    closed: bool,
    handles: Vec<JoinHandle<()>>,
}

/// Short-lived tasks that nobody awaits individually but that have to be
/// joined before their owner shuts down.
#[derive(Default)]
pub struct Detached {
    tasks: Mutex<Tasks>,
}

impl Detached {
    fn tasks(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `future` in background. Returns false without spawning once the
    /// collection has been closed.
    pub fn spawn<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks();
        if tasks.closed {
            return false;
        }
        tasks.handles.retain(|h| !h.is_finished());
        tasks.handles.push(tokio::spawn(future));
        true
    }

    pub fn pending(&self) -> usize {
        self.tasks().handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Reject any further spawns.
    pub fn close(&self) {
        self.tasks().closed = true;
    }

    /// Await all tasks spawned so far, including tasks that were spawned
    /// while waiting.
    pub async fn join_all(&self) {
        loop {
            let handles = std::mem::take(&mut self.tasks().handles);
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Detached task failed. [{}]", e);
                }
            }
        }
    }
}
