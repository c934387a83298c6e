//! Per-call execution context: deadline and cancellation.
//!
//! # Design
//! A `Context` is the only cancellation mechanism of the client. Clones share
//! the same cancellation flag, so one thread can cancel a call that another
//! thread is blocked in. The client checks the context before a round trip
//! and bounds the transport timeout by the remaining time. While the round
//! trip is in flight the caller keeps watching the context: cancelling it
//! returns `Cancelled` promptly and the late response, if any, is discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// A context with no deadline that is only cancelled explicitly.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left before the deadline. `Some(Duration::ZERO)` once it passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails with `Cancelled` or `Timeout` if the call must not proceed.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        match self.deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    Err(ApiError::timeout_after(now - deadline))
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    /// Effective timeout for one round trip: the smaller of the remaining
    /// context time and the client-wide limit.
    pub(crate) fn round_trip_timeout(&self, client_limit: Option<Duration>) -> Option<Duration> {
        match (self.remaining(), client_limit) {
            (Some(left), Some(limit)) => Some(left.min(limit)),
            (Some(left), None) => Some(left),
            (None, limit) => limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_context_never_expires() {
        let ctx = Context::background();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let ctx = Context::background();
        let handle = ctx.clone();
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check(), Err(ApiError::Cancelled)));
    }

    #[test]
    fn elapsed_deadline_reports_timeout() {
        let ctx = Context::with_deadline(Instant::now() - Duration::from_millis(5));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert!(matches!(ctx.check(), Err(ApiError::Timeout)));
    }

    #[test]
    fn cancellation_wins_over_timeout() {
        let ctx = Context::with_deadline(Instant::now() - Duration::from_millis(5));
        ctx.cancel();
        assert!(matches!(ctx.check(), Err(ApiError::Cancelled)));
    }

    #[test]
    fn round_trip_timeout_takes_the_smaller_bound() {
        let ctx = Context::with_timeout(Duration::from_secs(60));
        let effective = ctx.round_trip_timeout(Some(Duration::from_secs(1)));
        assert_eq!(effective, Some(Duration::from_secs(1)));

        let ctx = Context::background();
        assert_eq!(
            ctx.round_trip_timeout(Some(Duration::from_secs(7))),
            Some(Duration::from_secs(7))
        );
        assert_eq!(ctx.round_trip_timeout(None), None);

        let ctx = Context::with_timeout(Duration::from_millis(200));
        let effective = ctx.round_trip_timeout(None).unwrap();
        assert!(effective <= Duration::from_millis(200));
    }
}
