//! OpenAI-compatible HTTP client for text completions and vision chat.
//!
//! Works against llama.cpp's server, vLLM, OpenRouter, Groq and OpenAI itself:
//! text stages use `POST {endpoint}/completions`, the vision path uses
//! `POST {endpoint}/chat/completions` with an `image_url` content part.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::ModelConfig;
use crate::generation::{
    GenerationConfig, ModelError, TextGenerator, VisionGenerator, VisionRequest,
};

/// HTTP client for an OpenAI-compatible model server.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    text_model: String,
    vision_model: String,
    timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            text_model: config.text_model.clone(),
            vision_model: config.vision_model.clone(),
            timeout: config.request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<T, ModelError> {
        let url = format!("{}/{}", self.endpoint, path);
        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.map_transport(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, message });
        }

        response.json().await.map_err(|e| self.map_transport(e))
    }

    fn map_transport(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout(self.timeout)
        } else {
            ModelError::Request(err)
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.text_model
    }

    async fn invoke(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ModelError> {
        let payload = completion_payload(&self.text_model, prompt, config);
        debug!(model = %self.text_model, prompt_len = prompt.len(), "sending completion request");

        let resp: CompletionResponse = self.post_json("completions", &payload).await?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or(ModelError::EmptyResponse)
    }
}

#[async_trait]
impl VisionGenerator for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.vision_model
    }

    async fn describe_image(&self, request: &VisionRequest) -> Result<String, ModelError> {
        let payload = vision_payload(&self.vision_model, request);
        debug!(model = %self.vision_model, "sending vision chat request");

        let resp: ChatResponse = self.post_json("chat/completions", &payload).await?;
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ModelError::EmptyResponse)
    }
}

fn completion_payload(model: &str, prompt: &str, config: &GenerationConfig) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "model": model,
        "prompt": prompt,
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
        "echo": config.echo,
    });
    if !config.stop.is_empty() {
        payload["stop"] = serde_json::json!(config.stop);
    }
    payload
}

fn vision_payload(model: &str, request: &VisionRequest) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "model": model,
        "messages": [
            { "role": "system", "content": request.system_prompt },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": request.instruction },
                    {
                        "type": "image_url",
                        "image_url": { "url": request.image.as_url() }
                    }
                ]
            }
        ],
        "temperature": request.temperature,
    });
    if let Some(max_tokens) = request.max_tokens {
        payload["max_tokens"] = serde_json::json!(max_tokens);
    }
    payload
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
