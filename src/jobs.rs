use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Job {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs at most one background job at a time with observable start, cancel and join.
#[derive(Default)]
pub struct Supervisor {
    slot: Mutex<Option<Job>>,
}

impl Supervisor {
    pub fn new() -> Self { Self::default() }

    /// Spawn `job` unless one is still running. Returns whether it was started.
    pub fn start<F, Fut>(&self, name: &'static str, job: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_ref() {
            if !current.handle.is_finished() {
                tracing::debug!(running = current.name, requested = name, "job already running");
                return false;
            }
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(job(cancel.clone()));
        *slot = Some(Job { name, cancel, handle });
        true
    }

    pub fn is_running(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().is_some_and(|j| !j.handle.is_finished())
    }

    /// Signal the running job to stop. Returns false when nothing is running.
    pub fn cancel(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(job) if !job.handle.is_finished() => {
                job.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait for the current job, if any, to finish.
    pub async fn join(&self) {
        let job = self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(job) = job {
            if let Err(e) = job.handle.await {
                tracing::error!(job = job.name, "job ended abnormally: {e}");
            }
        }
    }

    pub async fn shutdown(&self) {
        self.cancel();
        self.join().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let jobs = Supervisor::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let r = runs.clone();
        assert!(jobs.start("drain", move |cancel| async move {
            r.fetch_add(1, Ordering::SeqCst);
            cancel.cancelled().await;
        }));
        let r = runs.clone();
        assert!(!jobs.start("drain", move |_| async move { r.fetch_add(1, Ordering::SeqCst); }));
        assert!(jobs.is_running());

        jobs.shutdown().await;
        assert!(!jobs.is_running());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn finished_job_frees_the_slot() {
        let jobs = Supervisor::new();
        assert!(jobs.start("quick", |_| async {}));
        jobs.join().await;
        assert!(!jobs.cancel());
        assert!(jobs.start("quick", |_| async { tokio::time::sleep(Duration::from_millis(1)).await }));
        jobs.join().await;
    }
}
