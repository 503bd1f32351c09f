//! Request-scoped outcomes returned by the two public call contracts.

use serde::{Deserialize, Serialize};

/// Result of the OCR-then-refine pipeline.
///
/// A failure is never paired with text: the two cases are separate variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "description", rename_all = "kebab-case")]
pub enum PipelineResult {
    /// The model produced a description.
    Description(String),
    /// No usable text was found in the image; no model was invoked.
    ExtractionFailure,
}

impl PipelineResult {
    pub fn described(text: impl Into<String>) -> Self {
        PipelineResult::Description(text.into())
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            PipelineResult::Description(text) => Some(text),
            PipelineResult::ExtractionFailure => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PipelineResult::ExtractionFailure)
    }
}

/// User-facing message for an unusable image.
pub const EXTRACTION_FAILURE_MESSAGE: &str =
    "The image you provided is too blurry or unclear to interpret. Please provide a new image.";

/// Why a remote image is or is not reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "status")]
pub enum AccessReason {
    Ok,
    Forbidden,
    NotFound,
    Timeout,
    NetworkError,
    HttpError(u16),
}

/// Outcome of probing a remote image URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityResult {
    pub is_accessible: bool,
    pub reason: AccessReason,
    /// Transport error text for `NetworkError`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AccessibilityResult {
    pub fn from_reason(reason: AccessReason) -> Self {
        Self {
            is_accessible: reason == AccessReason::Ok,
            reason,
            detail: None,
        }
    }

    pub fn network_error(detail: impl Into<String>) -> Self {
        Self {
            is_accessible: false,
            reason: AccessReason::NetworkError,
            detail: Some(detail.into()),
        }
    }

    /// Message shown to the caller instead of a description.
    pub fn message(&self) -> String {
        match self.reason {
            AccessReason::Ok => "Image is accessible.".to_string(),
            AccessReason::Forbidden => "Permission denied: Access forbidden (403).".to_string(),
            AccessReason::NotFound => "Image not found (404).".to_string(),
            AccessReason::Timeout => "Request timed out.".to_string(),
            AccessReason::HttpError(code) => format!("HTTP error {} occurred.", code),
            AccessReason::NetworkError => format!(
                "Error occurred: {}",
                self.detail.as_deref().unwrap_or("network failure")
            ),
        }
    }
}

/// Result of the vision-direct pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum VisionOutcome {
    Description { text: String },
    Inaccessible { accessibility: AccessibilityResult },
}

impl VisionOutcome {
    pub fn description(&self) -> Option<&str> {
        match self {
            VisionOutcome::Description { text } => Some(text),
            VisionOutcome::Inaccessible { .. } => None,
        }
    }

    /// The description, or the accessibility failure message.
    pub fn user_message(&self) -> String {
        match self {
            VisionOutcome::Description { text } => text.clone(),
            VisionOutcome::Inaccessible { accessibility } => accessibility.message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_result_failure_has_no_description() {
        assert_eq!(PipelineResult::ExtractionFailure.description(), None);
        assert_eq!(
            PipelineResult::described("steps").description(),
            Some("steps")
        );
        assert_ne!(
            PipelineResult::ExtractionFailure,
            PipelineResult::described("")
        );
    }

    #[test]
    fn accessibility_messages_match_reasons() {
        assert_eq!(
            AccessibilityResult::from_reason(AccessReason::Forbidden).message(),
            "Permission denied: Access forbidden (403)."
        );
        assert_eq!(
            AccessibilityResult::from_reason(AccessReason::HttpError(500)).message(),
            "HTTP error 500 occurred."
        );
        let err = AccessibilityResult::network_error("connection refused");
        assert!(!err.is_accessible);
        assert_eq!(err.message(), "Error occurred: connection refused");
    }

    #[test]
    fn pipeline_result_serializes_with_status_tag() {
        let json = serde_json::to_value(PipelineResult::ExtractionFailure).unwrap();
        assert_eq!(json["status"], "extraction-failure");
        let json = serde_json::to_value(PipelineResult::described("ok")).unwrap();
        assert_eq!(json["status"], "description");
        assert_eq!(json["description"], "ok");
    }
}
