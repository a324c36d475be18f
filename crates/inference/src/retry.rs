use std::time::Duration;

use {parley_config::RetryConfig, tracing::warn};

use crate::{
    backend::InferenceBackend,
    outcome::{InferenceOutcome, InferenceRequest},
};

/// Constant-delay retry policy for warm-up responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included. Zero behaves like one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            delay: cfg.delay(),
        }
    }
}

/// Invoke `backend`, repeating while it reports [`InferenceOutcome::Retryable`].
///
/// Returns the first non-retryable outcome, or the last retryable one once
/// the attempt budget is spent. `Fatal` and `Unusable` are never retried.
pub async fn with_retry(
    backend: &dyn InferenceBackend,
    request: &InferenceRequest,
    policy: &RetryPolicy,
) -> InferenceOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = backend.invoke(request).await;
        if !outcome.is_retryable() || attempt >= max_attempts {
            return outcome;
        }

        warn!(
            backend = backend.id(),
            attempt,
            max_attempts,
            delay_secs = policy.delay.as_secs_f64(),
            reason = outcome.detail(),
            "backend warming up, retrying"
        );
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        std::sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        tokio::time::Instant,
    };

    /// Replays a fixed script of outcomes, repeating the last one forever.
    struct ScriptedBackend {
        script: Mutex<Vec<InferenceOutcome>>,
        calls: AtomicUsize,
        call_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<InferenceOutcome>) -> Self {
            let mut script = script;
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
                call_times: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InferenceBackend for ScriptedBackend {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn invoke(&self, _request: &InferenceRequest) -> InferenceOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().unwrap().push(Instant::now());
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script[0].clone()
            }
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_warm_up_until_success() {
        let backend = ScriptedBackend::new(vec![
            InferenceOutcome::Retryable("loading".into()),
            InferenceOutcome::Retryable("loading".into()),
            InferenceOutcome::Success("ok".into()),
        ]);
        let start = Instant::now();

        let outcome = with_retry(&backend, &InferenceRequest::new("hi"), &policy(3)).await;

        assert_eq!(outcome, InferenceOutcome::Success("ok".into()));
        assert_eq!(backend.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));

        let times = backend.call_times.lock().unwrap();
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let backend = ScriptedBackend::new(vec![InferenceOutcome::Retryable("loading".into())]);

        let outcome = with_retry(&backend, &InferenceRequest::new("hi"), &policy(3)).await;

        assert!(outcome.is_retryable());
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_is_never_retried() {
        let backend = ScriptedBackend::new(vec![
            InferenceOutcome::Fatal("HTTP 401".into()),
            InferenceOutcome::Success("unreachable".into()),
        ]);
        let start = Instant::now();

        let outcome = with_retry(&backend, &InferenceRequest::new("hi"), &policy(3)).await;

        assert_eq!(outcome, InferenceOutcome::Fatal("HTTP 401".into()));
        assert_eq!(backend.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn unusable_is_never_retried() {
        let backend = ScriptedBackend::new(vec![InferenceOutcome::Unusable("empty".into())]);

        let outcome = with_retry(&backend, &InferenceRequest::new("hi"), &policy(3)).await;

        assert_eq!(outcome.kind(), "unusable");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_calls_once() {
        let backend = ScriptedBackend::new(vec![InferenceOutcome::Retryable("loading".into())]);

        let outcome = with_retry(&backend, &InferenceRequest::new("hi"), &policy(0)).await;

        assert!(outcome.is_retryable());
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn policy_from_config() {
        let cfg = RetryConfig {
            max_attempts: 4,
            delay_secs: 2,
        };
        assert_eq!(RetryPolicy::from(&cfg), RetryPolicy {
            max_attempts: 4,
            delay: Duration::from_secs(2),
        });
    }
}
