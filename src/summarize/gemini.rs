// Gemini generateContent client, reachable two ways:
//
// - the public Generative Language API, authenticated with an API key
// - Vertex AI, authenticated with an OAuth bearer token
//
// Both accept the same request body and return the same response shape,
// so one type covers them and only the URL and auth differ.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{summary_prompt, Summarizer};

const PUBLIC_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
enum Auth {
    ApiKey(String),
    Bearer(String),
}

/// Summarizer backed by a Gemini model.
pub struct GeminiSummarizer {
    client: Client,
    base_url: String,
    /// Path of the generateContent endpoint, beginning with '/'
    path: String,
    auth: Auth,
    rate_limiter: RateLimiter,
}

impl GeminiSummarizer {
    /// Public Gemini API with an API key.
    pub fn public(api_key: &str, model: &str, qps: f64) -> Self {
        Self {
            client: Client::new(),
            base_url: PUBLIC_BASE_URL.to_string(),
            path: format!("/v1beta/models/{model}:generateContent"),
            auth: Auth::ApiKey(api_key.to_string()),
            rate_limiter: RateLimiter::new(qps),
        }
    }

    /// Vertex AI in `project`/`location` with an access token.
    pub fn vertex(project: &str, location: &str, access_token: &str, model: &str, qps: f64) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("https://{location}-aiplatform.googleapis.com"),
            path: format!(
                "/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent"
            ),
            auth: Auth::Bearer(access_token.to_string()),
            rate_limiter: RateLimiter::new(qps),
        }
    }

    /// Point at a different host (used by tests against a mock server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        match self.auth {
            Auth::ApiKey(ref key) => format!("{}{}?key={}", self.base_url, self.path, key),
            Auth::Bearer(_) => format!("{}{}", self.base_url, self.path),
        }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, content: &str, char_limit: usize) -> Result<String> {
        self.rate_limiter.acquire().await;

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: summary_prompt(content, char_limit),
                }],
            }],
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Auth::Bearer(ref token) = self.auth {
            builder = builder.bearer_auth(token);
        }
        let response = builder
            .send()
            .await
            .context("Failed to call the Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            anyhow::bail!("Gemini API returned {}: {}", status, message);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.trim().is_empty())
            .context("Gemini API returned no text")?;

        debug!(chars = text.chars().count(), "Summary generated");
        Ok(text.trim().to_string())
    }
}

// --- generateContent request/response types ---

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const OK_BODY: &str = r#"{
        "candidates": [{
            "content": {"parts": [{"text": "  A short summary. "}], "role": "model"},
            "finishReason": "STOP"
        }]
    }"#;

    #[tokio::test]
    async fn test_public_api_sends_key_and_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "k123".into()))
            .match_body(Matcher::Regex("characters or less".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let s = GeminiSummarizer::public("k123", "gemini-2.0-flash", 0.0)
            .with_base_url(&server.url());
        let out = s.summarize("Some long article", 100).await.unwrap();

        assert_eq!(out, "A short summary.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_vertex_uses_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1/projects/proj/locations/us-central1/publishers/google/models/m:generateContent",
            )
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let s = GeminiSummarizer::vertex("proj", "us-central1", "tok", "m", 0.0)
            .with_base_url(&server.url());
        assert_eq!(s.summarize("x", 10).await.unwrap(), "A short summary.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_message_surfaces() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/m:generateContent")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"Permission denied"}}"#)
            .create_async()
            .await;

        let s = GeminiSummarizer::public("k", "m", 0.0).with_base_url(&server.url());
        let err = s.summarize("x", 10).await.unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
    }
}
