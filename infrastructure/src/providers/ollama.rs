//! Ollama provider (`POST /api/generate`, non-streaming).

use super::{map_http_error, status_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shardguard_application::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession};
use shardguard_domain::Model;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

fn generate_url(base_url: &str) -> String {
    format!("{}/api/generate", base_url.trim_end_matches('/'))
}

fn parse_generate_response(body: &str) -> Result<String, GatewayError> {
    serde_json::from_str::<GenerateResponse>(body)
        .map(|r| r.response)
        .map_err(|e| GatewayError::InvalidResponse(format!("Ollama: {}", e)))
}

pub struct OllamaGateway {
    client: Client,
    base_url: String,
}

impl OllamaGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl LlmGateway for OllamaGateway {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn create_session(&self, model: &Model) -> Result<Box<dyn LlmSession>, GatewayError> {
        Ok(Box::new(OllamaSession {
            client: self.client.clone(),
            url: generate_url(&self.base_url),
            model: model.clone(),
        }))
    }
}

pub struct OllamaSession {
    client: Client,
    url: String,
    model: Model,
}

#[async_trait]
impl LlmSession for OllamaSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(&self, content: &str) -> Result<String, GatewayError> {
        let request = GenerateRequest {
            model: self.model.as_str(),
            prompt: content,
            stream: false,
        };

        debug!(model = %self.model, bytes = content.len(), "Calling Ollama generate");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_http_error)?;
        if !status.is_success() {
            return Err(status_error(status, &body, self.model.as_str()));
        }

        parse_generate_response(&body)
    }
}
