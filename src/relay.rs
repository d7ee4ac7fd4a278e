//! Bounded relay - races a unit of work against a deadline.
//!
//! The deadline is applied once per exchange and cannot be renewed. When it
//! fires first, the work future is dropped, so anything it owns (an
//! in-flight call, an event channel) is released immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::{RelayError, Result};

/// Deadline applied to every badge exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Outcome of racing work against a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raced<T> {
    /// The work finished first; carries its own result.
    Completed(T),
    /// The deadline elapsed first.
    TimedOut,
}

impl<T> Raced<T> {
    /// Check if the deadline won the race.
    #[inline]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Raced::TimedOut)
    }

    /// Get the completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Raced::Completed(value) => Some(value),
            Raced::TimedOut => None,
        }
    }
}

/// Race `work` against `deadline`, whatever its output type.
///
/// Never resolves to `TimedOut` before `deadline` has elapsed.
pub async fn race_with_deadline<F>(work: F, deadline: Duration) -> Raced<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(output) => Raced::Completed(output),
        Err(_) => Raced::TimedOut,
    }
}

/// Race fallible `work` against `deadline`, mapping expiry to
/// [`RelayError::TimeoutExceeded`].
pub async fn relay_with_timeout<F, T>(deadline: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match race_with_deadline(work, deadline).await {
        Raced::Completed(outcome) => outcome,
        Raced::TimedOut => {
            tracing::debug!(deadline_ms = deadline.as_millis() as u64, "Exchange timed out");
            Err(RelayError::TimeoutExceeded)
        }
    }
}
