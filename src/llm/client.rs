// LLM client - Gemini generateContent over REST

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Gemini REST base URL
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Errors from a text generation call
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("GEMINI_API_KEY not configured")]
    MissingApiKey,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("response contained no text")]
    EmptyResponse,
}

/// Anything that can turn a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Gemini client
pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: GEMINI_API_BASE.to_string(),
            api_key,
            model,
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.api_base, self.model)
    }

    fn request_body(prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": 0.2,
                "responseMimeType": "application/json"
            }
        })
    }

    /// Timeouts can surface while sending or while reading the body
    fn classify_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Http(e)
        }
    }

    /// Concatenate the text parts of the first candidate
    fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(&Self::request_body(prompt))
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| self.classify_error(e))?;
        Self::extract_text(parsed)
    }
}
