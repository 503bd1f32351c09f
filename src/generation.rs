//! Text and vision generation capabilities.
//!
//! The pipelines only see the [`TextGenerator`] and [`VisionGenerator`] traits.
//! [`crate::llm_client::OpenAiCompatClient`] implements both over HTTP; tests
//! inject their own implementations. Shared handles are wrapped in a
//! [`ModelHandle`], which bounds concurrent invocations with a semaphore.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Semaphore, SemaphorePermit};

pub const DEFAULT_MAX_TOKENS: u32 = 10_000;
pub const DEFAULT_TEMPERATURE: f32 = 0.98;
pub const DEFAULT_STOP_MARKER: &str = "<|im_end|>";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("model endpoint returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("model returned no choices")]
    EmptyResponse,
    #[error("model handle has been shut down")]
    Unavailable,
    #[error("engine failure: {0}")]
    Engine(String),
}

/// Sampling parameters for one model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Echo the prompt back in the completion.
    pub echo: bool,
    /// Stop markers; generation ends at the first one produced.
    pub stop: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            echo: false,
            stop: vec![DEFAULT_STOP_MARKER.to_string()],
        }
    }
}

impl GenerationConfig {
    /// Apply per-stage overrides field by field.
    pub fn merged(&self, overrides: &GenerationOverrides) -> Self {
        Self {
            max_tokens: overrides.max_tokens.unwrap_or(self.max_tokens),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            echo: overrides.echo.unwrap_or(self.echo),
            stop: overrides.stop.clone().unwrap_or_else(|| self.stop.clone()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            ));
        }
        Ok(())
    }
}

/// Optional per-stage replacements for [`GenerationConfig`] fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOverrides {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub echo: Option<bool>,
    pub stop: Option<Vec<String>>,
}

/// How an image is handed to a multimodal model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Remote URL the model server fetches itself.
    Url(String),
    /// Inline `data:` URI.
    DataUri(String),
}

impl ImageRef {
    pub fn as_url(&self) -> &str {
        match self {
            ImageRef::Url(url) | ImageRef::DataUri(url) => url,
        }
    }
}

/// A single multimodal chat request.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub system_prompt: String,
    pub instruction: String,
    pub image: ImageRef,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Run one completion for `prompt` and return the generated text.
    async fn invoke(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ModelError>;
}

#[async_trait]
pub trait VisionGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Run one chat completion over an image and return the reply text.
    async fn describe_image(&self, request: &VisionRequest) -> Result<String, ModelError>;
}

/// Process-scoped generator shared across requests.
///
/// Every invocation holds a semaphore permit for its duration, so at most
/// `max_concurrent` calls reach the underlying generator at once.
pub struct ModelHandle<G: ?Sized> {
    inner: Arc<G>,
    semaphore: Arc<Semaphore>,
}

impl<G: ?Sized> Clone for ModelHandle<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            semaphore: Arc::clone(&self.semaphore),
        }
    }
}

impl<G: ?Sized> ModelHandle<G> {
    pub fn new(inner: Arc<G>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Stop admitting invocations. In-flight calls finish normally.
    pub fn shutdown(&self) {
        self.semaphore.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.semaphore.is_closed()
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>, ModelError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| ModelError::Unavailable)
    }
}

#[async_trait]
impl<G> TextGenerator for ModelHandle<G>
where
    G: TextGenerator + ?Sized,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn invoke(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ModelError> {
        let _permit = self.permit().await?;
        self.inner.invoke(prompt, config).await
    }
}

#[async_trait]
impl<G> VisionGenerator for ModelHandle<G>
where
    G: VisionGenerator + ?Sized,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn describe_image(&self, request: &VisionRequest) -> Result<String, ModelError> {
        let _permit = self.permit().await?;
        self.inner.describe_image(request).await
    }
}
