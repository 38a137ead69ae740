//! Cancellation coordination for long-running transfers.

use tokio_util::sync::CancellationToken;

/// Caller-supplied cancellation signal.
///
/// Cloning shares the signal. Every executor attempt, backoff sleep and
/// session start observes it.
#[derive(Debug, Clone)]
pub struct Cancellation {
    token: CancellationToken,
}

impl Cancellation {
    /// Create a new, untriggered signal.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Trigger the signal. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been triggered.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
