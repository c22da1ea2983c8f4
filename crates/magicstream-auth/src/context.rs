//! Per-operation deadline and cancellation.
//!
//! Every lifecycle operation takes an [`OpContext`]. Store calls are run
//! through [`OpContext::run`], which gives up when the context is
//! cancelled or its deadline (or the per-call limit) passes. Dropping a
//! store future mid-flight is safe because each store write is a single
//! atomic statement: the record holds either the old pair or the new one.

use std::future::Future;
use std::time::Duration;

use magicstream_core::error::MagicStreamResult;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AuthError;

#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl OpContext {
    /// No deadline, never cancelled unless [`OpContext::cancel`] is called.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Tie this context to an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fail fast if the context is already done.
    pub fn ensure_active(&self) -> Result<(), AuthError> {
        if self.cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => {
                Err(AuthError::StoreUnavailable("deadline exceeded".into()))
            }
            _ => Ok(()),
        }
    }

    /// Drive a store call under this context and an extra per-call limit.
    ///
    /// The outer `Result` reports cancellation or timeout; the inner one
    /// is the store's own answer, left for the caller to interpret.
    pub async fn run<T, F>(&self, limit: Duration, fut: F) -> Result<MagicStreamResult<T>, AuthError>
    where
        F: Future<Output = MagicStreamResult<T>>,
    {
        self.ensure_active()?;

        let per_call = Instant::now() + limit;
        let deadline = match self.deadline {
            Some(at) if at < per_call => at,
            _ => per_call,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AuthError::Cancelled),
            res = tokio::time::timeout_at(deadline, fut) => {
                res.map_err(|_| AuthError::StoreUnavailable("store call timed out".into()))
            }
        }
    }
}
