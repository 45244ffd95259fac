//! Completion provider seam and the HTTP client behind it.
//!
//! The engine only ever asks for one thing from a language model: a text
//! completion for a (system prompt, user prompt) pair. Anything that can answer
//! that implements `CompletionProvider`; `LlmClient` does it against an
//! OpenAI-compatible chat-completions endpoint.

use crate::config::{is_usable_key, EngineConfig};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// False when the provider holds no usable credential. The generator skips
    /// the AI path entirely in that case.
    fn is_configured(&self) -> bool {
        true
    }

    /// Produce a completion. Transport errors, timeouts and payloads without a
    /// completion field are all reported as errors.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;
}

#[derive(Clone)]
pub struct LlmClient {
    api_key: Option<String>,
    api_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    fn is_configured(&self) -> bool {
        is_usable_key(self.api_key.as_deref())
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EngineError::Llm("No API key configured".to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "stream": false,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "top_p": 0.9
        });

        debug!("Calling completion endpoint {} with model {}", self.api_url, self.model);

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Llm(format!("LLM API returned {}: {}", status, text)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions payload.
pub fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    let content = response_json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| EngineError::Llm("No content in LLM response".to_string()))?;

    Ok(content.trim().to_string())
}
