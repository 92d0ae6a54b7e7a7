//! Gemini-backed classifier.
//!
//! One non-streaming `generateContent` call per message. The API key travels
//! as a query parameter and is kept in a [`SecretString`] so it never lands
//! in `Debug` output or logs.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::ClassifierError;
use crate::parse::{PARSE_ERROR_REASON, parse_classification};
use crate::prompt::build_prompt;
use crate::types::{Classification, QueryClassifier};

/// Connection settings for [`GeminiClassifier`].
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key.
    pub api_key: SecretString,
    /// Model name, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// API base URL (without trailing slash).
    pub base_url: String,
    /// Per-call deadline.
    pub timeout: Duration,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classifier
// ─────────────────────────────────────────────────────────────────────────────

/// Classifier that asks a Gemini model.
pub struct GeminiClassifier {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClassifier {
    /// Create a classifier sharing `client`.
    pub fn new(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    /// Model in use.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String, ClassifierError> {
        let body = GenerateRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(self.api_url())
            .query(&[("key", self.config.api_key.expose_secret())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(ClassifierError::RateLimited {
                    retry_after_ms: retry_after.unwrap_or(0) * 1000,
                });
            }
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: parse_api_error(&body, status.as_u16()),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text())
    }
}

/// Pull `error.message` out of a Google API error body.
fn parse_api_error(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[async_trait]
impl QueryClassifier for GeminiClassifier {
    #[instrument(skip_all, fields(model = %self.config.model, chars = text.chars().count()))]
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        let prompt = build_prompt(text);
        let timeout_ms = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
        let raw = tokio::time::timeout(self.config.timeout, self.generate(&prompt))
            .await
            .map_err(|_| ClassifierError::Timeout { timeout_ms })??;

        if let Some(verdict) = parse_classification(&raw) {
            debug!(
                is_query = verdict.is_query,
                confidence = verdict.confidence,
                "classified message"
            );
            Ok(verdict)
        } else {
            warn!(response = %raw, "unparseable classifier response");
            Ok(Classification::not_query(PARSE_ERROR_REASON))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn classifier(server: &MockServer, timeout: Duration) -> GeminiClassifier {
        GeminiClassifier::new(
            reqwest::Client::new(),
            GeminiConfig {
                api_key: SecretString::from("test-key".to_string()),
                model: "gemini-2.5-flash".into(),
                base_url: server.uri(),
                timeout,
            },
        )
    }

    fn model_reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn positive_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(
                r#"{"isQuery": true, "confidence": 91, "reasoning": "asks for DBMS notes"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let c = classifier(&server, Duration::from_secs(5))
            .classify("anyone has DBMS notes?")
            .await
            .unwrap();
        assert!(c.is_query);
        assert_eq!(c.confidence, 91);
    }

    #[tokio::test]
    async fn fenced_reply_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(
                "```json\n{\"isQuery\": false, \"confidence\": 95, \"reasoning\": \"greeting\"}\n```",
            )))
            .mount(&server)
            .await;

        let c = classifier(&server, Duration::from_secs(5))
            .classify("hello")
            .await
            .unwrap();
        assert!(!c.is_query);
        assert_eq!(c.reasoning, "greeting");
    }

    #[tokio::test]
    async fn prose_reply_reads_as_not_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(model_reply("I think it is a request")),
            )
            .mount(&server)
            .await;

        let c = classifier(&server, Duration::from_secs(5))
            .classify("pyq pls")
            .await
            .unwrap();
        assert_eq!(c, Classification::not_query(PARSE_ERROR_REASON));
    }

    #[tokio::test]
    async fn empty_candidates_read_as_not_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let c = classifier(&server, Duration::from_secs(5))
            .classify("pyq pls")
            .await
            .unwrap();
        assert!(!c.is_query);
    }

    #[tokio::test]
    async fn api_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = classifier(&server, Duration::from_secs(5))
            .classify("notes")
            .await
            .unwrap_err();
        assert_matches!(err, ClassifierError::Api { status: 400, ref message } if message == "API key not valid");
    }

    #[tokio::test]
    async fn quota_error_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = classifier(&server, Duration::from_secs(5))
            .classify("notes")
            .await
            .unwrap_err();
        assert_matches!(err, ClassifierError::RateLimited { retry_after_ms: 7000 });
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(model_reply(r#"{"isQuery": true, "confidence": 99}"#))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = classifier(&server, Duration::from_millis(50))
            .classify("notes")
            .await
            .unwrap_err();
        assert_matches!(err, ClassifierError::Timeout { timeout_ms: 50 });
    }

    #[test]
    fn api_error_fallback_message() {
        assert_eq!(parse_api_error("not json", 503), "HTTP 503");
    }
}
