//! Cooperative cancellation signals for asynchronous loads.
//!
//! A [`CancelSource`] owns the right to cancel; [`CancelToken`]s observe it.
//! Sources can be derived from a parent token so that cancelling the parent
//! (for example a caller's signal) also cancels every derived source, while
//! cancelling a derived source leaves the parent untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::Notify;

/// Shared cancellation state.
#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
    children: Mutex<Vec<Weak<CancelInner>>>,
}

impl CancelInner {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();
        let children = std::mem::take(
            &mut *self
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cloneable, read-only view of a cancel signal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// A token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// What: Wait until cancellation is requested.
    ///
    /// Output:
    /// - Completes immediately if already cancelled; never completes for [`CancelToken::never`]
    ///
    /// Details:
    /// - Registers interest before re-checking the flag so a concurrent
    ///   `cancel()` cannot slip between the check and the wait
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Owner of a cancel signal.
///
/// Dropping the source does not cancel its tokens.
#[derive(Debug, Default)]
pub struct CancelSource {
    inner: Arc<CancelInner>,
}

impl CancelSource {
    /// Create an independent, uncancelled source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What: Create a source that is also cancelled when `parent` is.
    ///
    /// Inputs:
    /// - `parent`: Token whose cancellation propagates to the new source
    ///
    /// Output:
    /// - A new source; already cancelled if `parent` already is
    #[must_use]
    pub fn child_of(parent: &CancelToken) -> Self {
        let inner = Arc::new(CancelInner::default());
        {
            let mut children = parent
                .inner
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if parent.is_cancelled() {
                inner.cancelled.store(true, Ordering::Release);
            } else {
                children.retain(|c| c.strong_count() > 0);
                children.push(Arc::downgrade(&inner));
            }
        }
        Self { inner }
    }

    /// Token observing this source.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Request cancellation; wakes every pending `cancelled()` wait. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}
