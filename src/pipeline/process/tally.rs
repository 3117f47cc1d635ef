use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Progress is reported every this many completions.
pub const PROGRESS_EVERY: usize = 10;

/// One progress observation: `(done, total_at_start, succeeded, failed)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: i64,
    pub succeeded: usize,
    pub failed: usize,
}

pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Outcome counts of one drain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub total_at_start: i64,
    pub succeeded: usize,
    pub failed: usize,
    pub batches: usize,
}

impl DrainReport {
    pub fn completed(&self) -> usize { self.succeeded + self.failed }
}

#[derive(Debug)]
pub enum DrainError {
    /// Stopped by the cancellation token; in-flight work was awaited first.
    Cancelled(DrainReport),
    Store(anyhow::Error),
}

impl fmt::Display for DrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainError::Cancelled(r) => write!(
                f,
                "processing cancelled after {}/{} articles (succeeded={} failed={})",
                r.completed(), r.total_at_start, r.succeeded, r.failed
            ),
            DrainError::Store(err) => write!(f, "store error: {err:#}"),
        }
    }
}

impl std::error::Error for DrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DrainError::Store(err) => Some(err.as_ref()),
            DrainError::Cancelled(_) => None,
        }
    }
}

#[derive(Default)]
struct Counts { succeeded: usize, failed: usize }

/// Shared success/failure accumulator handed to every worker of one drain.
pub struct Tally {
    total: i64,
    counts: Mutex<Counts>,
    observer: ProgressFn,
}

impl Tally {
    pub fn new(total: i64, observer: ProgressFn) -> Self {
        Self { total, counts: Mutex::new(Counts::default()), observer }
    }

    pub fn record(&self, ok: bool) {
        let progress = {
            let mut c = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
            if ok { c.succeeded += 1 } else { c.failed += 1 }
            let done = c.succeeded + c.failed;
            (done % PROGRESS_EVERY == 0 || done as i64 == self.total)
                .then_some(Progress { done, total: self.total, succeeded: c.succeeded, failed: c.failed })
        };
        if let Some(p) = progress { (self.observer)(p) }
    }

    pub fn progress(&self) -> Progress {
        let c = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        Progress { done: c.succeeded + c.failed, total: self.total, succeeded: c.succeeded, failed: c.failed }
    }

    /// Final observation plus the report.
    pub fn finish(&self, batches: usize) -> DrainReport {
        let p = self.progress();
        (self.observer)(p);
        self.report(batches)
    }

    pub fn report(&self, batches: usize) -> DrainReport {
        let p = self.progress();
        DrainReport { total_at_start: self.total, succeeded: p.succeeded, failed: p.failed, batches }
    }
}
