//! # Download Context
//!
//! A cancellable execution context threaded through the probe and every chunk
//! worker of a transfer. It combines an explicit cancellation signal with an
//! optional deadline, and reports which of the two stopped it.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason a context stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// `cancel()` was called on this context or one of its parents
    Canceled,
    /// The deadline elapsed
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct DownloadContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl DownloadContext {
    /// A context that only stops when canceled
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context that stops `timeout` from now, or earlier if canceled
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that stops with this one, but can also be canceled
    /// on its own without affecting the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Underlying token, for callers wiring external signals into the context
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Non-blocking check of whether the context has stopped, and why.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Wait until the context stops.
    pub async fn done(&self) -> ContextError {
        // Timers fire on millisecond ticks; agree with `err()` when it already knows
        if let Some(reason) = self.err() {
            return reason;
        }
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ContextError::Canceled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }
}

impl Default for DownloadContext {
    fn default() -> Self {
        Self::new()
    }
}
