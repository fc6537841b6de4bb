// ollama.rs — BinaryValidator backed by a local Ollama-compatible model.
//
// Calls `POST {endpoint}/api/generate` with deterministic decoding and a
// three-token budget. Every failure is mapped to IntentError so the hybrid
// strategy can fall back to keyword-only classification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IntentError;
use crate::validator::BinaryValidator;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Validator that asks a small local model for a YES/NO verdict.
pub struct OllamaValidator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaValidator {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }
}

#[async_trait]
impl BinaryValidator for OllamaValidator {
    async fn ask(&self, prompt: &str) -> Result<String, IntentError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                num_predict: 3,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| IntentError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IntentError::Unavailable(format!(
                "validator returned HTTP {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| IntentError::MalformedResponse(e.to_string()))?;
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
