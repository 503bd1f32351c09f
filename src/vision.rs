//! Describe an image by sending it straight to a multimodal model.

use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::DynamicImage;
use tracing::{debug, info};

use crate::access::AccessibilityChecker;
use crate::config::VisionConfig;
use crate::error::{FlowError, Result};
use crate::generation::{ImageRef, VisionGenerator, VisionRequest};
use crate::image_loader::{decode_bytes, encode_png, load_image};
use crate::types::VisionOutcome;

/// Where the image for a vision request comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Remote image; probed before the model is called.
    Url(String),
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Inline an image as a `data:image/png;base64,…` URI.
pub fn png_data_uri(image: &DynamicImage) -> Result<String> {
    let png = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}

pub struct VisionDirectGenerator {
    generator: Arc<dyn VisionGenerator>,
    checker: AccessibilityChecker,
    settings: VisionConfig,
}

impl VisionDirectGenerator {
    pub fn new(
        generator: Arc<dyn VisionGenerator>,
        checker: AccessibilityChecker,
        settings: VisionConfig,
    ) -> Self {
        Self {
            generator,
            checker,
            settings,
        }
    }

    pub fn checker(&self) -> &AccessibilityChecker {
        &self.checker
    }

    /// Probe (URLs only), then issue exactly one chat request.
    pub async fn generate(&self, source: &ImageSource) -> Result<VisionOutcome> {
        let image = match source {
            ImageSource::Url(url) => {
                let accessibility = self.checker.check(url).await;
                if !accessibility.is_accessible {
                    return Ok(VisionOutcome::Inaccessible { accessibility });
                }
                ImageRef::Url(url.clone())
            }
            ImageSource::Path(path) => ImageRef::DataUri(png_data_uri(&load_image(path)?)?),
            ImageSource::Bytes(bytes) => ImageRef::DataUri(png_data_uri(&decode_bytes(bytes)?)?),
        };

        let request = VisionRequest {
            system_prompt: self.settings.system_prompt.clone(),
            instruction: self.settings.instruction.clone(),
            image,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        info!(model = self.generator.name(), "requesting vision description");
        let text = self
            .generator
            .describe_image(&request)
            .await
            .map_err(|e| FlowError::model(format!("vision request failed: {e}")))?;
        debug!(%text, "vision description");

        Ok(VisionOutcome::Description { text })
    }
}
