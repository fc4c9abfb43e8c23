//! Deadlines and bounded retries around collaborator calls.
//!
//! A collaborator call that outlives its deadline becomes
//! [`AgentError::Timeout`], which callers treat like any other transient
//! failure.

use std::future::Future;
use std::time::Duration;

use crate::error::{AgentError, Result};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Retry policy for a single collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub attempts: u32,

    /// Fixed delay between attempts.
    pub backoff: Duration,

    /// Deadline for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A single attempt with the given deadline.
    pub fn once(timeout: Duration) -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
            timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run `fut` with a deadline, mapping expiry to [`AgentError::Timeout`].
pub async fn with_timeout<T, F>(collaborator: &'static str, after: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_elapsed) => {
            tracing::warn!(collaborator, timeout = ?after, "collaborator call timed out");
            Err(AgentError::Timeout {
                collaborator,
                after,
            })
        }
    }
}

/// Call `op` until it succeeds, the policy's attempts run out, or it fails
/// with a non-transient error. Returns the last error on exhaustion.
pub async fn retry<T, F, Fut>(collaborator: &'static str, policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.attempts.max(1);

    for attempt in 1..=max_attempts {
        tracing::debug!(collaborator, attempt, max_attempts, "collaborator attempt");

        match with_timeout(collaborator, policy.timeout, op()).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && e.is_transient() => {
                tracing::warn!(collaborator, attempt, error = %e, "attempt failed, retrying");
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(e) => {
                tracing::warn!(collaborator, attempt, error = %e, "giving up");
                return Err(e);
            }
        }
    }

    // `max_attempts >= 1`, so the loop always returns.
    Err(AgentError::Timeout {
        collaborator,
        after: policy.timeout,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let out = retry("test", fast(3), move || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AgentError::ClassifierFailed { reason: "503".into() })
                } else {
                    Ok("Interested")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(out, "Interested");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_exhausting_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let err = retry("test", fast(3), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AgentError::ClassifierFailed { reason: "down".into() })
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AgentError::ClassifierFailed { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_key_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let err = retry("test", fast(3), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AgentError::MissingApiKey { provider: "hf".into() })
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AgentError::MissingApiKey { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_becomes_timeout_error() {
        let err = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AgentError::Timeout { collaborator: "slow", .. }));
        assert!(err.is_transient());
    }
}
