use super::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn message_constructors_use_provider_roles() {
    assert_eq!(Message::system("rules").role, "system");
    assert_eq!(Message::user("hi").role, "user");
    let msg = Message::assistant("hello");
    assert_eq!(msg.role, "assistant");
    assert_eq!(msg.content, "hello");
}

#[test]
fn retry_config_from_settings() {
    let settings = RetrySettings {
        max_retries: 5,
        initial_delay_ms: 200,
        max_delay_ms: 4000,
    };
    let config = RetryConfig::from(&settings);
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.initial_delay_ms, 200);
    assert_eq!(config.max_delay_ms, 4000);
    assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
}

fn fast_retry(max_retries: usize) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_delay_ms: 1,
        max_delay_ms: 2,
        backoff_multiplier: 1.0,
    }
}

fn request() -> ChatRequest<'static> {
    ChatRequest {
        messages: vec![Message::user("hi")],
        model: None,
        max_tokens: 16,
        temperature: 0.0,
    }
}

/// Fails with the queued errors first, then succeeds.
struct FlakyProvider {
    failures: Mutex<Vec<ColloquyError>>,
    calls: AtomicUsize,
}

impl FlakyProvider {
    fn new(mut failures: Vec<ColloquyError>) -> Self {
        failures.reverse();
        Self {
            failures: Mutex::new(failures),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LLMProvider for FlakyProvider {
    async fn chat(&self, _req: ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap().pop() {
            Some(err) => Err(err.into()),
            None => Ok(LLMResponse::text("ok")),
        }
    }

    fn default_model(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn retries_transient_errors_then_succeeds() {
    let provider = FlakyProvider::new(vec![
        ColloquyError::Provider {
            message: "overloaded".into(),
            retryable: true,
        },
        ColloquyError::Provider {
            message: "overloaded".into(),
            retryable: true,
        },
    ]);
    let response = provider
        .chat_with_retry(request(), Some(fast_retry(3)))
        .await
        .unwrap();
    assert_eq!(response.content.as_deref(), Some("ok"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn auth_errors_are_not_retried() {
    let provider = FlakyProvider::new(vec![ColloquyError::Auth("bad key".into())]);
    let err = provider
        .chat_with_retry(request(), Some(fast_retry(3)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("bad key"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let failures = (0..5)
        .map(|_| ColloquyError::Provider {
            message: "still down".into(),
            retryable: true,
        })
        .collect();
    let provider = FlakyProvider::new(failures);
    let err = provider
        .chat_with_retry(request(), Some(fast_retry(2)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("still down"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn no_retry_config_makes_single_attempt() {
    let provider = FlakyProvider::new(vec![ColloquyError::Provider {
        message: "down".into(),
        retryable: true,
    }]);
    assert!(
        provider
            .chat_with_retry(request(), Some(RetryConfig::none()))
            .await
            .is_err()
    );
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn default_metrics_are_zero() {
    let provider = FlakyProvider::new(vec![]);
    let metrics = provider.metrics();
    assert_eq!(metrics.request_count, 0);
    assert_eq!(metrics.error_count, 0);
}

#[tokio::test]
async fn retry_after_hint_is_capped_by_max_delay() {
    let provider = FlakyProvider::new(vec![ColloquyError::RateLimit {
        retry_after: Some(u64::MAX),
    }]);
    let response = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        provider.chat_with_retry(request(), Some(fast_retry(1))),
    )
    .await
    .expect("retry-after hint should be capped")
    .unwrap();
    assert_eq!(response.content.as_deref(), Some("ok"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}
