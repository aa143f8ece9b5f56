//! Per-call timeout and shutdown cancellation for backend operations.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::StorageError;

/// Bounds applied to every call a gateway makes to its backend.
#[derive(Debug, Clone)]
pub struct CallLimits {
    timeout: Duration,
    shutdown: CancellationToken,
}

impl CallLimits {
    pub fn new(timeout: Duration, shutdown: CancellationToken) -> Self {
        Self { timeout, shutdown }
    }

    /// Drive `call` to completion unless it outlives the timeout or the
    /// shutdown token fires first.
    pub async fn run<T, F>(&self, operation: &'static str, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(StorageError::Cancelled { operation }),
            res = tokio::time::timeout(self.timeout, call) => match res {
                Ok(out) => out,
                Err(_) => {
                    tracing::warn!(operation, timeout = ?self.timeout, "Storage call timed out");
                    Err(StorageError::Timeout {
                        operation,
                        after: self.timeout,
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let limits = CallLimits::new(Duration::from_secs(1), CancellationToken::new());
        let out = limits.run("exists", async { Ok(true) }).await.unwrap();
        assert!(out);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let limits = CallLimits::new(Duration::from_secs(5), CancellationToken::new());
        let err = limits
            .run("download", std::future::pending::<Result<(), StorageError>>())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Timeout { operation: "download", after } if after == Duration::from_secs(5)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_by_shutdown() {
        let token = CancellationToken::new();
        let limits = CallLimits::new(Duration::from_secs(60), token.clone());
        token.cancel();
        let err = limits
            .run("upload", std::future::pending::<Result<(), StorageError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Cancelled { operation: "upload" }));
    }
}
