//! Owned, process-scoped entry point for both description pipelines.
//!
//! [`Resources`] holds the expensive handles (OCR engine, text model, vision
//! model) and is built once at startup. [`FlowDescriber`] wires them into the
//! request-scoped pipelines and exposes the two call contracts:
//! [`FlowDescriber::extract_and_describe`] and [`FlowDescriber::describe_from_url`].

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tracing::{info, warn};

use crate::access::AccessibilityChecker;
use crate::artifacts::{stem_of, write_artifacts, Annotator, ArtifactPaths};
use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::fast_path::{FastPath, FastPathOutput};
use crate::gate::{gate, GateOutcome};
use crate::generation::{ModelHandle, TextGenerator, VisionGenerator};
use crate::image_loader::{decode_bytes, load_image};
use crate::llm_client::OpenAiCompatClient;
use crate::ocr::{OcrAdapter, OcrError};
use crate::refine::{RefinementPipeline, RefinementTrace};
use crate::types::{AccessibilityResult, Detections, PipelineResult, VisionOutcome};
use crate::vision::{ImageSource, VisionDirectGenerator};

/// Image handed to the OCR pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageInput {
    fn load(&self) -> Result<DynamicImage> {
        Ok(match self {
            ImageInput::Path(path) => load_image(path)?,
            ImageInput::Bytes(bytes) => decode_bytes(bytes)?,
        })
    }

    fn artifact_stem(&self) -> String {
        match self {
            ImageInput::Path(path) => stem_of(path),
            ImageInput::Bytes(_) => "image".to_string(),
        }
    }
}

/// Expensive handles created once and shared by every request.
pub struct Resources {
    pub ocr: Option<OcrAdapter>,
    pub text: ModelHandle<dyn TextGenerator>,
    pub vision: ModelHandle<dyn VisionGenerator>,
}

impl Resources {
    /// Validate config and build every handle. OCR initialization failure is
    /// fatal here.
    pub fn init(config: &Config) -> Result<Self> {
        let mut resources = Self::init_without_ocr(config)?;
        let ocr = OcrAdapter::tesseract(&config.ocr, config.preprocess)?;
        info!(language = %config.ocr.language, "OCR engine initialized");
        resources.ocr = Some(ocr);
        Ok(resources)
    }

    /// Model handles only, for hosts that never run the OCR pipeline.
    pub fn init_without_ocr(config: &Config) -> Result<Self> {
        config.validate().map_err(FlowError::config)?;
        let client = Arc::new(OpenAiCompatClient::new(&config.model)?);
        info!(
            endpoint = client.endpoint(),
            text_model = %config.model.text_model,
            vision_model = %config.model.vision_model,
            "model client initialized"
        );
        Ok(Self::from_parts(
            None,
            client.clone(),
            client,
            config.model.max_concurrent_invocations,
        ))
    }

    pub fn from_parts(
        ocr: Option<OcrAdapter>,
        text: Arc<dyn TextGenerator>,
        vision: Arc<dyn VisionGenerator>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            ocr,
            text: ModelHandle::new(text, max_concurrent),
            vision: ModelHandle::new(vision, max_concurrent),
        }
    }
}

/// Per-call knobs for the OCR pipeline.
#[derive(Debug, Clone, Default)]
pub struct DescribeOptions {
    pub fast_mode: bool,
    /// Replaces `[compression] ratio` for this call.
    pub compression_ratio: Option<f32>,
    pub artifacts_dir: Option<PathBuf>,
}

/// What the OCR half of the pipeline saw.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrReport {
    pub detections: Detections,
    pub joined_text: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactPaths>,
}

/// Everything a full OCR-then-describe run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeReport {
    pub result: PipelineResult,
    pub ocr: OcrReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<RefinementTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast: Option<FastPathOutput>,
}

pub struct FlowDescriber {
    ocr: Option<OcrAdapter>,
    text: ModelHandle<dyn TextGenerator>,
    vision: ModelHandle<dyn VisionGenerator>,
    refine: RefinementPipeline,
    fast: FastPath,
    vision_direct: VisionDirectGenerator,
    annotator: Annotator,
}

impl FlowDescriber {
    pub fn new(resources: Resources, config: &Config) -> Result<Self> {
        config.validate().map_err(FlowError::config)?;

        let text: Arc<dyn TextGenerator> = Arc::new(resources.text.clone());
        let vision: Arc<dyn VisionGenerator> = Arc::new(resources.vision.clone());
        let checker = AccessibilityChecker::new(config.network.probe_timeout)?;

        Ok(Self {
            refine: RefinementPipeline::from_config(Arc::clone(&text), config)?,
            fast: FastPath::from_config(text, config)?,
            vision_direct: VisionDirectGenerator::new(vision, checker, config.vision.clone()),
            annotator: Annotator::from_config(&config.artifacts),
            ocr: resources.ocr,
            text: resources.text,
            vision: resources.vision,
        })
    }

    /// Wire injected engines instead of the configured ones.
    pub fn with_components(
        ocr: OcrAdapter,
        text: Arc<dyn TextGenerator>,
        vision: Arc<dyn VisionGenerator>,
        config: &Config,
    ) -> Result<Self> {
        let resources = Resources::from_parts(
            Some(ocr),
            text,
            vision,
            config.model.max_concurrent_invocations,
        );
        Self::new(resources, config)
    }

    /// Stop serving model calls. In-flight invocations complete.
    pub fn shutdown(&self) {
        self.text.shutdown();
        self.vision.shutdown();
        info!("model handles shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.text.is_shut_down() && self.vision.is_shut_down()
    }

    /// OCR plus gate only; never invokes a model.
    pub async fn detect_text(
        &self,
        input: &ImageInput,
        artifacts_dir: Option<&Path>,
    ) -> Result<OcrReport> {
        let ocr = self.ocr.as_ref().ok_or(OcrError::NotAvailable)?;
        let original = input.load()?;
        let run = ocr.run(original.clone()).await?;

        let artifacts = artifacts_dir.and_then(|dir| {
            let detections = run.detections.as_slice().unwrap_or(&[]);
            match write_artifacts(
                dir,
                &input.artifact_stem(),
                &original,
                &run.preprocessed,
                detections,
                &self.annotator,
            ) {
                Ok(paths) => Some(paths),
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "failed to write OCR artifacts");
                    None
                }
            }
        });

        let (passed, joined_text) = match gate(&run.detections) {
            GateOutcome::Pass(text) => (true, text),
            GateOutcome::Fail => (false, String::new()),
        };

        Ok(OcrReport {
            detections: run.detections,
            joined_text,
            passed,
            artifacts,
        })
    }

    /// `extractAndDescribe`: OCR, gate, then the refinement chain or fast path.
    pub async fn extract_and_describe(
        &self,
        input: &ImageInput,
        fast_mode: bool,
    ) -> Result<PipelineResult> {
        let options = DescribeOptions {
            fast_mode,
            ..Default::default()
        };
        Ok(self.describe(input, &options).await?.result)
    }

    /// Full OCR pipeline run with intermediate outputs kept.
    pub async fn describe(
        &self,
        input: &ImageInput,
        options: &DescribeOptions,
    ) -> Result<DescribeReport> {
        let ocr = self
            .detect_text(input, options.artifacts_dir.as_deref())
            .await?;

        if !ocr.passed {
            info!("image unusable; skipping model invocation");
            return Ok(DescribeReport {
                result: PipelineResult::ExtractionFailure,
                ocr,
                trace: None,
                fast: None,
            });
        }

        if options.fast_mode {
            let fast = match options.compression_ratio {
                Some(ratio) => Cow::Owned(self.fast.with_ratio(ratio)?),
                None => Cow::Borrowed(&self.fast),
            };
            let output = fast.run(&ocr.joined_text).await?;
            Ok(DescribeReport {
                result: PipelineResult::described(output.description.clone()),
                ocr,
                trace: None,
                fast: Some(output),
            })
        } else {
            let trace = self.refine.run(&ocr.joined_text).await?;
            Ok(DescribeReport {
                result: PipelineResult::described(trace.description.clone()),
                ocr,
                trace: Some(trace),
                fast: None,
            })
        }
    }

    /// `describeFromUrl`: probe the URL, then one vision request.
    pub async fn describe_from_url(&self, url: &str) -> Result<VisionOutcome> {
        self.vision_direct
            .generate(&ImageSource::Url(url.to_string()))
            .await
    }

    /// Vision-direct description for any image source.
    pub async fn describe_image(&self, source: &ImageSource) -> Result<VisionOutcome> {
        self.vision_direct.generate(source).await
    }

    pub async fn check_url(&self, url: &str) -> AccessibilityResult {
        self.vision_direct.checker().check(url).await
    }
}
