//! One-shot HTTP client for Hugging Face style text-generation endpoints.
//!
//! Backends return HTTP 200 for soft failures too (`{"error": "..."}`), so
//! classification looks at the body as well as the status.

use std::time::Duration;

use {
    async_trait::async_trait,
    parley_config::BackendConfig,
    reqwest::StatusCode,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    serde_json::Value,
    tracing::{debug, trace},
};

use crate::{
    error::{Error, Result},
    outcome::{GenerationParams, InferenceOutcome, InferenceRequest},
};

/// Something that can turn an [`InferenceRequest`] into an [`InferenceOutcome`].
///
/// Implementations never retry on their own and never panic or error: every
/// failure is folded into the outcome tag.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Identifier used in logs (e.g. "gpt2").
    fn id(&self) -> &str;

    async fn invoke(&self, request: &InferenceRequest) -> InferenceOutcome;
}

/// Error substrings that mean "model is still loading, try again shortly".
///
/// A bare "loading" is not enough: "Error loading tokenizer config" is a
/// permanent failure.
const WARM_UP_PATTERNS: &[&str] = &[
    "is currently loading",
    "is loading",
    "still loading",
    "warming up",
    "cold start",
];

/// Connection settings for one configured inference endpoint.
#[derive(Clone)]
pub struct BackendTarget {
    pub id: String,
    pub endpoint: reqwest::Url,
    pub token: Option<Secret<String>>,
    pub timeout: Duration,
    pub send_parameters: bool,
}

impl BackendTarget {
    pub fn from_config(cfg: &BackendConfig) -> Result<Self> {
        let endpoint =
            reqwest::Url::parse(&cfg.endpoint).map_err(|_| Error::InvalidEndpoint {
                id: cfg.id.clone(),
                endpoint: cfg.endpoint.clone(),
            })?;
        // Empty tokens (e.g. an unset `${HF_TOKEN}` with an empty fallback) mean no auth.
        let token = cfg
            .token
            .as_ref()
            .filter(|t| !t.expose_secret().trim().is_empty())
            .cloned();
        Ok(Self {
            id: cfg.id.clone(),
            endpoint,
            token,
            timeout: cfg.timeout(),
            send_parameters: cfg.send_parameters,
        })
    }
}

impl std::fmt::Debug for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendTarget")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.token.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    inputs: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a GenerationParams>,
}

/// [`InferenceBackend`] speaking the Hugging Face Inference API over HTTP.
pub struct HttpBackend {
    target: BackendTarget,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(target: BackendTarget, client: reqwest::Client) -> Self {
        Self { target, client }
    }
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    fn id(&self) -> &str {
        &self.target.id
    }

    async fn invoke(&self, request: &InferenceRequest) -> InferenceOutcome {
        let body = RequestBody {
            inputs: &request.inputs,
            parameters: self.target.send_parameters.then_some(&request.params),
        };

        let mut req = self
            .client
            .post(self.target.endpoint.clone())
            .timeout(self.target.timeout)
            .json(&body);
        if let Some(ref token) = self.target.token {
            req = req.bearer_auth(token.expose_secret());
        }

        debug!(
            backend = %self.target.id,
            prompt_chars = request.inputs.chars().count(),
            "sending inference request"
        );

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return transport_failure(&self.target, &e),
        };
        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return transport_failure(&self.target, &e),
        };
        trace!(backend = %self.target.id, %status, body = %text, "inference response");

        classify_response(status, &text)
    }
}

fn transport_failure(target: &BackendTarget, err: &reqwest::Error) -> InferenceOutcome {
    if err.is_timeout() {
        InferenceOutcome::Fatal(format!(
            "request to {} timed out after {}s",
            target.id,
            target.timeout.as_secs()
        ))
    } else {
        InferenceOutcome::Fatal(format!("request to {} failed: {err}", target.id))
    }
}

/// Classify a backend response.
///
/// Priority: warm-up (503 or a loading error message) beats every other
/// status, non-2xx is fatal, and only a recognized shape with non-empty text
/// counts as success.
#[must_use]
pub fn classify_response(status: StatusCode, body: &str) -> InferenceOutcome {
    let json: Option<Value> = serde_json::from_str(body).ok();
    let error = json.as_ref().and_then(error_message);

    if status == StatusCode::SERVICE_UNAVAILABLE
        || error.as_deref().is_some_and(is_warm_up_message)
        || json.as_ref().is_some_and(has_estimated_time)
    {
        let reason = error.unwrap_or_else(|| format!("HTTP {status}: model unavailable"));
        return InferenceOutcome::Retryable(reason);
    }

    if !status.is_success() {
        let detail = error.unwrap_or_else(|| truncate(body.trim(), 200));
        return InferenceOutcome::Fatal(format!("HTTP {status}: {detail}"));
    }

    let Some(json) = json else {
        return InferenceOutcome::Unusable("response body is not JSON".into());
    };

    match generated_text(&json) {
        Some(text) if !text.trim().is_empty() => InferenceOutcome::Success(text.to_string()),
        Some(_) => InferenceOutcome::Unusable("backend returned empty generated_text".into()),
        None => InferenceOutcome::Unusable(
            error.unwrap_or_else(|| "unrecognized response shape".into()),
        ),
    }
}

/// `[{"generated_text": ...}]` or `{"generated_text": ...}`.
fn generated_text(json: &Value) -> Option<&str> {
    let obj = match json {
        Value::Array(items) => items.first()?,
        other => other,
    };
    obj.get("generated_text")?.as_str()
}

/// `{"error": "..."}` or `{"error": ["...", ...]}`.
fn error_message(json: &Value) -> Option<String> {
    match json.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        },
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn has_estimated_time(json: &Value) -> bool {
    json.get("error").is_some() && json.get("estimated_time").is_some()
}

fn is_warm_up_message(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    WARM_UP_PATTERNS.iter().any(|p| msg.contains(p))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, rstest::rstest, serde_json::json};

    fn target(endpoint: &str, token: Option<&str>) -> BackendTarget {
        BackendTarget {
            id: "test".into(),
            endpoint: reqwest::Url::parse(endpoint).unwrap(),
            token: token.map(|t| Secret::new(t.to_string())),
            timeout: Duration::from_secs(5),
            send_parameters: true,
        }
    }

    #[rstest]
    #[case(200, r#"[{"generated_text": "User: hi\nAI: hello"}]"#, "success")]
    #[case(200, r#"{"generated_text": "hello"}"#, "success")]
    #[case(503, r#"{"error": "Model gpt2 is currently loading", "estimated_time": 20.0}"#, "retryable")]
    #[case(503, "", "retryable")]
    #[case(200, r#"{"error": "Model gpt2 is currently loading"}"#, "retryable")]
    #[case(500, r#"{"error": "Model is warming up"}"#, "retryable")]
    #[case(500, r#"{"error": "Error loading tokenizer config"}"#, "fatal")]
    #[case(200, r#"{"error": "Error loading tokenizer config"}"#, "unusable")]
    #[case(401, r#"{"error": "Invalid credentials in Authorization header"}"#, "fatal")]
    #[case(404, "Not Found", "fatal")]
    #[case(500, "", "fatal")]
    #[case(200, r#"[{"generated_text": "   "}]"#, "unusable")]
    #[case(200, r#"[]"#, "unusable")]
    #[case(200, r#"{"summary_text": "hello"}"#, "unusable")]
    #[case(200, r#"{"error": "Input is too long"}"#, "unusable")]
    #[case(200, "<html>oops</html>", "unusable")]
    fn classifies_response_shapes(#[case] status: u16, #[case] body: &str, #[case] kind: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        assert_eq!(classify_response(status, body).kind(), kind, "body: {body}");
    }

    #[test]
    fn success_keeps_full_generated_text() {
        let outcome = classify_response(
            StatusCode::OK,
            r#"[{"generated_text": "User: Hello\nAI: Hi there!"}]"#,
        );
        assert_eq!(
            outcome,
            InferenceOutcome::Success("User: Hello\nAI: Hi there!".into())
        );
    }

    #[test]
    fn fatal_reason_carries_backend_error() {
        let outcome = classify_response(StatusCode::FORBIDDEN, r#"{"error": ["bad token"]}"#);
        assert_eq!(
            outcome,
            InferenceOutcome::Fatal("HTTP 403 Forbidden: bad token".into())
        );
    }

    #[test]
    fn long_bodies_are_truncated_in_reasons() {
        let body = "x".repeat(500);
        let outcome = classify_response(StatusCode::BAD_GATEWAY, &body);
        assert!(outcome.detail().chars().count() < 250);
    }

    #[tokio::test]
    async fn posts_inputs_parameters_and_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gpt2")
            .match_header("authorization", "Bearer hf_secret")
            .match_body(Matcher::Json(json!({
                "inputs": "User: Hello\nAI:",
                "parameters": { "max_new_tokens": 100, "temperature": 0.7 }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"generated_text": "User: Hello\nAI: Hi there!"}]"#)
            .create_async()
            .await;

        let backend = HttpBackend::new(
            target(&format!("{}/models/gpt2", server.url()), Some("hf_secret")),
            reqwest::Client::new(),
        );
        let outcome = backend
            .invoke(&InferenceRequest::new("User: Hello\nAI:"))
            .await;

        assert!(outcome.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_auth_header_and_parameters_when_disabled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({ "inputs": "hi" })))
            .with_status(200)
            .with_body(r#"{"generated_text": "hello"}"#)
            .create_async()
            .await;

        let mut t = target(&format!("{}/", server.url()), None);
        t.send_parameters = false;
        let backend = HttpBackend::new(t, reqwest::Client::new());
        let outcome = backend.invoke(&InferenceRequest::new("hi")).await;

        assert_eq!(outcome, InferenceOutcome::Success("hello".into()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connection_refused_is_fatal() {
        let backend = HttpBackend::new(target("http://127.0.0.1:1/", None), reqwest::Client::new());
        let outcome = backend.invoke(&InferenceRequest::new("hi")).await;
        assert_eq!(outcome.kind(), "fatal");
        assert!(outcome.detail().contains("request to test failed"));
    }

    #[tokio::test]
    async fn timeout_is_fatal() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let mut t = target(&format!("http://{addr}/"), None);
        t.timeout = Duration::from_secs(1);
        let backend = HttpBackend::new(t, reqwest::Client::new());
        let outcome = backend.invoke(&InferenceRequest::new("hi")).await;

        assert_eq!(outcome.kind(), "fatal");
        assert_eq!(outcome.detail(), "request to test timed out after 1s");
        hold.abort();
    }

    #[test]
    fn target_from_config_drops_blank_token() {
        let mut cfg = BackendConfig::huggingface_gpt2();
        cfg.token = Some(Secret::new("  ".into()));
        let target = BackendTarget::from_config(&cfg).unwrap();
        assert!(target.token.is_none());
        assert_eq!(target.timeout, Duration::from_secs(60));
    }

    #[test]
    fn target_from_config_rejects_bad_endpoint() {
        let mut cfg = BackendConfig::huggingface_gpt2();
        cfg.endpoint = "not a url".into();
        let err = BackendTarget::from_config(&cfg).unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
    }

    #[test]
    fn debug_hides_token() {
        let t = target("https://example.test/", Some("hf_secret"));
        let debug = format!("{t:?}");
        assert!(!debug.contains("hf_secret"));
        assert!(debug.contains("authenticated: true"));
    }
}
