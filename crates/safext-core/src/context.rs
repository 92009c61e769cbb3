//! Cooperative cancellation for a running extraction.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use crate::ExtractionError;
use crate::Result;
use crate::error::CancelReason;

/// Cancellation flag plus optional deadline, checked by the extraction
/// driver before decompression, before each peek, before each entry and
/// before each filesystem mutation.
///
/// The core never spawns threads or timers; the deadline is compared
/// against the clock whenever [`check`](Self::check) runs.
///
/// # Examples
///
/// ```
/// use safext_core::ExtractionContext;
/// use std::time::Duration;
///
/// let ctx = ExtractionContext::with_timeout(Duration::from_secs(30));
/// let handle = ctx.cancel_handle();
/// assert!(ctx.check().is_ok());
/// handle.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Handle that cancels the context it was taken from.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl ExtractionContext {
    /// Context that is never cancelled unless its handle is used.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline(Instant::now().checked_add(timeout))
    }

    /// Context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::new().deadline(Some(deadline))
    }

    fn deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns a handle that can cancel this context from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Returns `true` once cancelled or past the deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// Fails with [`ExtractionError::Cancelled`] once cancelled or expired.
    pub fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(ExtractionError::Cancelled {
                reason: CancelReason::Cancelled,
            });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ExtractionError::Cancelled {
                reason: CancelReason::DeadlineExceeded,
            });
        }
        Ok(())
    }
}
