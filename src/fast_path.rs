//! Single-call alternative to the refinement chain.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::compression::{CompressedPrompt, PromptCompressor};
use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::generation::TextGenerator;
use crate::prompts::{PromptStage, StageName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FastPathOutput {
    /// The compressed prompt actually sent to the model.
    pub prompt: CompressedPrompt,
    pub description: String,
}

#[derive(Clone)]
pub struct FastPath {
    generator: Arc<dyn TextGenerator>,
    stage: PromptStage,
    compressor: PromptCompressor,
}

impl FastPath {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        stage: PromptStage,
        compressor: PromptCompressor,
    ) -> Self {
        Self {
            generator,
            stage,
            compressor,
        }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &Config) -> Result<Self> {
        let stage = PromptStage::from_config(StageName::Fast, config)
            .map_err(|e| FlowError::config(format!("stage 'fast' template {e}")))?;
        let compressor = PromptCompressor::from_config(&config.compression)
            .map_err(|e| FlowError::config(e.to_string()))?;
        Ok(Self::new(generator, stage, compressor))
    }

    /// A copy that compresses with `ratio` instead of the configured one.
    pub fn with_ratio(&self, ratio: f32) -> Result<Self> {
        let compressor = self
            .compressor
            .with_ratio(ratio)
            .map_err(|e| FlowError::config(e.to_string()))?;
        Ok(Self {
            compressor,
            ..self.clone()
        })
    }

    /// Format the combined template, compress it, and invoke the model once.
    pub async fn run(&self, text: &str) -> Result<FastPathOutput> {
        if text.trim().is_empty() {
            return Err(FlowError::model("fast path has no input text"));
        }

        let formatted = self.stage.render(text);
        let prompt = self.compressor.compress(&formatted);
        info!(
            original_tokens = prompt.original_tokens,
            kept_tokens = prompt.kept_tokens,
            ratio = self.compressor.ratio(),
            "running fast path"
        );
        debug!(prompt = %prompt.text, "compressed fast-path prompt");

        let description = self
            .generator
            .invoke(&prompt.text, &self.stage.generation)
            .await
            .map_err(|e| FlowError::model(format!("stage 'fast' failed: {e}")))?;

        if description.trim().is_empty() {
            return Err(FlowError::model("stage 'fast' produced no text"));
        }
        info!(output_chars = description.len(), "fast path finished");

        Ok(FastPathOutput {
            prompt,
            description,
        })
    }
}
