//! Google Gemini provider (`models/{model}:generateContent`).

use super::{map_http_error, status_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shardguard_application::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession};
use shardguard_domain::Model;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

fn build_request(prompt: &str) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: Some(prompt.to_string()),
            }],
        }],
    }
}

/// Endpoint without the key; the key is attached as a query parameter so
/// it never shows up in logged URLs.
fn generate_url(base_url: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}

/// Text parts of the first candidate, concatenated.
fn extract_text(body: &str) -> Result<String, GatewayError> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::InvalidResponse(format!("Gemini: {}", e)))?;

    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| GatewayError::InvalidResponse("Gemini: no candidates".to_string()))?;

    Ok(content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join(""))
}

pub struct GeminiGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn create_session(&self, model: &Model) -> Result<Box<dyn LlmSession>, GatewayError> {
        Ok(Box::new(GeminiSession {
            client: self.client.clone(),
            url: generate_url(&self.base_url, model.as_str()),
            api_key: self.api_key.clone(),
            model: model.clone(),
        }))
    }
}

pub struct GeminiSession {
    client: Client,
    url: String,
    api_key: String,
    model: Model,
}

#[async_trait]
impl LlmSession for GeminiSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(&self, content: &str) -> Result<String, GatewayError> {
        debug!(model = %self.model, bytes = content.len(), "Calling Gemini generateContent");

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request(content))
            .send()
            .await
            .map_err(|e| map_http_error(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_http_error(e.without_url()))?;
        if !status.is_success() {
            return Err(status_error(status, &body, self.model.as_str()));
        }

        extract_text(&body)
    }
}
