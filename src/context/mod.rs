use std::{future::Future, time::Duration};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallError {
    #[error("Deadline exceeded")]
    DeadlineExceeded,
    #[error("Cancelled")]
    Cancelled,
}

/// Deadline and cancellation applied to every remote call.
///
/// The default context has no deadline and cannot be cancelled, so calls run until the
/// service answers.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl CallContext {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now. The clock starts when this is called, not per call.
    ///
    /// A timeout too large to represent as an instant leaves the context without a deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }

    /// Drive `call` to completion unless the deadline passes or the token is cancelled first.
    pub async fn run<F>(&self, call: F) -> Result<F::Output, CallError>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(CallError::Cancelled);
        }

        let timed = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, call)
                    .await
                    .map_err(|_| CallError::DeadlineExceeded),
                None => Ok(call.await),
            }
        };

        match &self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(CallError::Cancelled),
                result = timed => result,
            },
            None => timed.await,
        }
    }
}
