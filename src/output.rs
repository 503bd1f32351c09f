use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactPaths;
use crate::error::ErrorPayload;
use crate::refine::StageOutput;
use crate::types::{AccessibilityResult, Detections, PipelineResult, VisionOutcome};

/// Schema version for output payloads.
pub const FLOWDESC_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum FlowOutput {
    Describe(DescribeOutput),
    Vision(VisionOutput),
    CheckUrl(CheckUrlOutput),
    Ocr(OcrOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeOutput {
    pub version: String,
    pub image: String,
    pub fast_mode: bool,
    pub result: PipelineResult,
    /// User-facing text when the image was unusable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub detection_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactPaths>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSummary {
    pub original_tokens: usize,
    pub kept_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionOutput {
    pub version: String,
    pub input: String,
    pub outcome: VisionOutcome,
    /// Description text, or the accessibility failure message.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUrlOutput {
    pub version: String,
    pub url: String,
    pub accessibility: AccessibilityResult,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOutput {
    pub version: String,
    pub image: String,
    pub detections: Detections,
    pub joined_text: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactPaths>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
