//! flowdesc library
//!
//! Turns an image of a flowgraph into a natural-language description. Two
//! pipelines are available:
//!
//! - OCR then refine: text detection, a blur/failure gate, then either a
//!   three-stage Clean → Understand → Describe model chain or a single
//!   compressed-prompt fast path.
//! - Vision direct: the image (or its URL, after an accessibility probe) goes
//!   straight to a multimodal model.
//!
//! # Module Overview
//!
//! - [`ocr`] - OCR adapter and the Tesseract engine (feature `ocr`)
//! - [`gate`] / [`text`] - usable-text check and fragment joining
//! - [`refine`] / [`fast_path`] / [`compression`] - text pipelines
//! - [`access`] / [`vision`] - URL probe and vision-direct generation
//! - [`describer`] - owned resources and the public call contracts
//! - [`config`] - configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use flowdesc_lib::{Config, FlowDescriber, ImageInput, Resources};
//!
//! # async fn example() -> flowdesc_lib::Result<()> {
//! let config = Config::load(None)?;
//! let describer = FlowDescriber::new(Resources::init(&config)?, &config)?;
//!
//! let result = describer
//!     .extract_and_describe(&ImageInput::Path("flow.png".into()), false)
//!     .await?;
//! println!("{:?}", result.description());
//!
//! describer.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod artifacts;
pub mod compression;
pub mod config;
pub mod describer;
pub mod error;
pub mod fast_path;
pub mod gate;
pub mod generation;
pub mod image_loader;
pub mod llm_client;
pub mod logging;
pub mod ocr;
pub mod output;
pub mod preprocess;
pub mod prompts;
pub mod refine;
pub mod resource;
pub mod text;
pub mod types;
pub mod vision;

pub use access::{classify_status, AccessibilityChecker};
pub use compression::{CompressedPrompt, PromptCompressor};
pub use config::Config;
pub use describer::{DescribeOptions, DescribeReport, FlowDescriber, ImageInput, OcrReport, Resources};
pub use error::{ErrorCategory, ErrorPayload, FlowError, Result};
pub use fast_path::FastPath;
pub use gate::{gate, GateOutcome};
pub use generation::{
    GenerationConfig, ModelError, ModelHandle, TextGenerator, VisionGenerator, VisionRequest,
};
pub use llm_client::OpenAiCompatClient;
pub use ocr::{OcrAdapter, OcrEngine, OcrError};
pub use output::{
    CheckUrlOutput, DescribeOutput, ErrorOutput, FlowOutput, OcrOutput, VisionOutput,
    FLOWDESC_OUTPUT_VERSION,
};
pub use prompts::{PromptStage, PromptTemplate, StageName};
pub use refine::{RefinementPipeline, RefinementTrace, StageOutput};
pub use resource::parse_image_source;
pub use text::join;
pub use types::{
    AccessReason, AccessibilityResult, Detection, Detections, PipelineResult, Region,
    VisionOutcome,
};
pub use vision::{ImageSource, VisionDirectGenerator};
