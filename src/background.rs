//! Best-effort background tasks.
//!
//! Remote cart pushes run after the local mutation has completed. Their
//! failures are logged and never reach the caller; nothing is retried, the
//! next push sends the full cart again.

use std::{fmt::Display, future::Future};

use tokio::{
    runtime::Handle,
    task::{JoinError, JoinSet},
};
use tracing::{debug, warn};

/// Fire-and-forget tasks with a logging-only error boundary.
#[derive(Debug)]
pub struct BackgroundTasks {
    tasks: JoinSet<()>,
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundTasks {
    /// Create an empty task set.
    pub fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
        }
    }

    /// Run `task` on the current tokio runtime.
    ///
    /// Without a runtime the task is dropped with a warning.
    pub fn spawn<F, E>(&mut self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.reap();

        let Ok(handle) = Handle::try_current() else {
            warn!(task = label, "no async runtime available; background task skipped");
            return;
        };

        self.tasks.spawn_on(
            async move {
                match task.await {
                    Ok(()) => debug!(task = label, "background task finished"),
                    Err(error) => warn!(task = label, %error, "background task failed"),
                }
            },
            &handle,
        );
    }

    /// Number of tasks not yet joined.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every pending task.
    pub async fn flush(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join(result);
        }
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
        }
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(error) = result {
        warn!(%error, "background task did not complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[tokio::test]
    async fn flush_waits_for_all_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = BackgroundTasks::new();

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            tasks.spawn("count", async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            });
        }

        tasks.flush().await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let mut tasks = BackgroundTasks::new();

        tasks.spawn("fail", async { Err::<(), _>("remote down") });
        tasks.flush().await;

        assert_eq!(tasks.pending(), 0);
    }

    #[test]
    fn spawn_without_runtime_is_skipped() {
        let mut tasks = BackgroundTasks::new();

        tasks.spawn("orphan", async { Ok::<(), String>(()) });

        assert_eq!(tasks.pending(), 0);
    }
}
