pub mod core;
pub mod outcome;

pub use self::core::{Detection, Detections, Point, Region};
pub use outcome::{
    AccessReason, AccessibilityResult, PipelineResult, VisionOutcome, EXTRACTION_FAILURE_MESSAGE,
};
