use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;

use crate::error::{CompletionError, GatewayError};
use crate::traits::{CompletionRequest, Completer};

/// Bounded retry with geometric backoff. The delay before retrying attempt
/// `i` (0-based) is `base_delay * growth_factor^i`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub growth_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            growth_factor: 1.1,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.mul_f64(self.growth_factor.powi(attempt as i32))
    }
}

/// Wraps a [`Completer`] with the retry policy shared by every LLM caller.
///
/// An attempt counts as failed if the call errors or comes back
/// empty/whitespace-only. Once the attempt budget is spent, the last
/// underlying error is surfaced; there is no partial or default result.
pub struct Gateway<C> {
    completer: C,
    policy: RetryPolicy,
}

impl<C: Completer> Gateway<C> {
    pub fn new(completer: C, policy: RetryPolicy) -> Self {
        Self { completer, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke the completion, retrying per policy. Blocks the calling task
    /// during backoff; one worker processes one item at a time.
    pub async fn invoke(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        self.run(request, None).await
    }

    /// Like [`Gateway::invoke`], but the backoff sleep is raced against a
    /// shutdown signal so a long retry chain does not hold up termination.
    pub async fn invoke_with_cancel(
        &self,
        request: &CompletionRequest,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<String, GatewayError> {
        self.run(request, Some(cancel)).await
    }

    async fn run(
        &self,
        request: &CompletionRequest,
        mut cancel: Option<&mut watch::Receiver<bool>>,
    ) -> Result<String, GatewayError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_err = CompletionError::EmptyResponse;

        for attempt in 0..attempts {
            match self.completer.complete(request).await {
                Ok(text) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
                Ok(_) => last_err = CompletionError::EmptyResponse,
                Err(e) => last_err = e,
            }

            if attempt + 1 < attempts {
                let delay = self.policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_err,
                    "LLM call failed, retrying after backoff"
                );
                match cancel.as_deref_mut() {
                    Some(rx) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            changed = rx.changed() => {
                                if changed.is_err() || *rx.borrow() {
                                    return Err(GatewayError::Cancelled);
                                }
                            }
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
            }
        }

        Err(GatewayError::Exhausted {
            attempts,
            source: last_err,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    use async_trait::async_trait;

    use super::*;

    /// Completer that plays back a script of results, one per attempt.
    struct Scripted {
        calls: AtomicU32,
        script: Mutex<Vec<Result<String, CompletionError>>>,
    }

    impl Scripted {
        fn new(script: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                script: Mutex::new(script),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Completer for Scripted {
        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok("fallback".into())
            } else {
                script.remove(0)
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(10),
            growth_factor: 2.0,
        }
    }

    #[tokio::test]
    async fn returns_success_after_two_failures() {
        let completer = Scripted::new(vec![
            Err(CompletionError::Malformed("boom".into())),
            Err(CompletionError::Malformed("boom again".into())),
            Ok("third time lucky".into()),
        ]);
        let gateway = Gateway::new(completer, fast_policy(3));

        let out = gateway
            .invoke(&CompletionRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(out, "third time lucky");
        assert_eq!(gateway.completer.calls(), 3);
    }

    #[tokio::test]
    async fn empty_response_is_retried_like_an_error() {
        let completer = Scripted::new(vec![Ok("   \n".into()), Ok("real answer".into())]);
        let gateway = Gateway::new(completer, fast_policy(2));

        let out = gateway
            .invoke(&CompletionRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(out, "real answer");
        assert_eq!(gateway.completer.calls(), 2);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_the_last_error() {
        let completer = Scripted::new(vec![
            Err(CompletionError::Malformed("first".into())),
            Err(CompletionError::Malformed("last".into())),
        ]);
        let gateway = Gateway::new(completer, fast_policy(2));

        let err = gateway
            .invoke(&CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        match err {
            GatewayError::Exhausted { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(source.to_string().contains("last"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(gateway.completer.calls(), 2);
    }

    #[tokio::test]
    async fn backoff_delays_grow_geometrically() {
        let completer = Scripted::new(vec![
            Err(CompletionError::EmptyResponse),
            Err(CompletionError::EmptyResponse),
            Ok("done".into()),
        ]);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(40),
            growth_factor: 2.0,
        };
        // delay_for(0)=40ms, delay_for(1)=80ms => at least 120ms total
        assert_eq!(policy.delay_for(0), Duration::from_millis(40));
        assert_eq!(policy.delay_for(1), Duration::from_millis(80));

        let gateway = Gateway::new(completer, policy);
        let started = Instant::now();
        gateway.invoke(&CompletionRequest::new("hi")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn cancel_interrupts_backoff() {
        let completer = Scripted::new(vec![Err(CompletionError::EmptyResponse)]);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
            growth_factor: 1.0,
        };
        let gateway = Gateway::new(completer, policy);

        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let err = gateway
            .invoke_with_cancel(&CompletionRequest::new("hi"), &mut rx)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
    }

    #[tokio::test]
    async fn single_attempt_policy_never_sleeps() {
        let completer = Scripted::new(vec![Err(CompletionError::EmptyResponse)]);
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_secs(60),
            growth_factor: 2.0,
        };
        let gateway = Gateway::new(completer, policy);

        let started = Instant::now();
        let err = gateway
            .invoke(&CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(err.attempts(), Some(1));
    }
}
