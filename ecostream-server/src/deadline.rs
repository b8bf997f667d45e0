//! Per-call deadlines for backing-store operations
//!
//! Every store and object-store call receives a [`Deadline`] from its caller.
//! When the deadline passes, the in-flight future is dropped (cancelling the
//! backing call) and the operation fails with [`DeadlineExceeded`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Marker error for an operation that did not finish before its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded(pub &'static str);

/// Absolute instant by which a store call must complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    /// Drive `fut` to completion unless the deadline passes first.
    ///
    /// `op` names the operation in the resulting error.
    pub async fn run<T, E, F>(self, op: &'static str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<DeadlineExceeded>,
    {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation = op, "Backing store call cancelled at deadline");
                Err(DeadlineExceeded(op).into())
            }
        }
    }
}
