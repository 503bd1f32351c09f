use crate::config::ConfigLoadError;
use crate::generation::ModelError;
use crate::image_loader::ImageLoadError;
use crate::ocr::OcrError;
use crate::resource::ResourceParseError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl FlowError {
    pub fn model(message: impl Into<String>) -> Self {
        FlowError::ModelInvocation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        FlowError::Config(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            FlowError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            FlowError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity/proxy/VPN and retry.",
            ),
            FlowError::Ocr(e) => match e {
                OcrError::NotAvailable => ErrorPayload::new(
                    ErrorCategory::Ocr,
                    e.to_string(),
                    "Rebuild with `--features ocr` and install Tesseract (libtesseract + leptonica).",
                ),
                OcrError::InitError(_) => ErrorPayload::new(
                    ErrorCategory::Ocr,
                    e.to_string(),
                    "Check [ocr] language/datapath; set TESSDATA_PREFIX to the tessdata directory.",
                ),
                _ => ErrorPayload::new(
                    ErrorCategory::Ocr,
                    e.to_string(),
                    "Verify the image is readable; run with --verbose for engine details.",
                ),
            },
            FlowError::ModelInvocation(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("timed out") || lower.contains("timeout") {
                    ErrorPayload::new(
                        ErrorCategory::Model,
                        msg.to_string(),
                        "Increase [model] request_timeout or lower [generation] max_tokens.",
                    )
                } else if lower.contains("401") || lower.contains("unauthorized") {
                    ErrorPayload::new(
                        ErrorCategory::Model,
                        msg.to_string(),
                        "Set FLOWDESC_API_KEY (or [model] api_key) for the model endpoint.",
                    )
                } else if lower.contains("shut down") {
                    ErrorPayload::new(
                        ErrorCategory::Model,
                        msg.to_string(),
                        "Restart the process; the model handle is no longer serving requests.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Model,
                        msg.to_string(),
                        "Check that the model server at [model] endpoint is running and reachable.",
                    )
                }
            }
            FlowError::Image(e) => ErrorPayload::new(
                ErrorCategory::Image,
                e.to_string(),
                "Verify image path/format and readability.",
            ),
            FlowError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON/serialization inputs; run with --verbose for details.",
            ),
            FlowError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("compression") && lower.contains("ratio") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Use a compression ratio greater than 0 and at most 1 (e.g., 0.1).",
                    )
                } else if lower.contains("placeholder") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Stage templates must contain the {text} placeholder exactly once.",
                    )
                } else if lower.contains("unsupported file extension") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Use a supported image type (png, jpg, jpeg, webp, gif, bmp, tiff).",
                    )
                } else if lower.contains("local file not found") || lower.contains("file not found")
                {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Verify the file exists; use an absolute path or run from the working directory.",
                    )
                } else if lower.contains("invalid url") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Verify URL/format (e.g., https://example.com/diagram.png).",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths and the config file (--config).",
                    )
                }
            }
            FlowError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

impl From<ImageLoadError> for FlowError {
    fn from(err: ImageLoadError) -> Self {
        match err {
            ImageLoadError::Load(e) => FlowError::Image(e),
            ImageLoadError::NotFound(path) => FlowError::Config(format!("File not found: {}", path)),
            ImageLoadError::Save(msg) => FlowError::Io(std::io::Error::other(format!(
                "Failed to save image: {}",
                msg
            ))),
        }
    }
}

impl From<ResourceParseError> for FlowError {
    fn from(err: ResourceParseError) -> Self {
        FlowError::Config(err.to_string())
    }
}

impl From<ConfigLoadError> for FlowError {
    fn from(err: ConfigLoadError) -> Self {
        FlowError::Config(err.to_string())
    }
}

impl From<ModelError> for FlowError {
    fn from(err: ModelError) -> Self {
        FlowError::ModelInvocation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Ocr,
    Model,
    Image,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
