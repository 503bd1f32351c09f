//! Core types produced by the OCR side of the pipeline.
//!
//! - [`Point`] / [`Region`] - Detection geometry
//! - [`Detection`] - One recognized text fragment
//! - [`Detections`] - Engine output, keeping "nothing found" distinct from an empty list

use serde::{Deserialize, Serialize};

/// A single polygon vertex in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Ordered 4-point polygon: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub points: [Point; 4],
}

impl Region {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Build an axis-aligned region from a top-left corner and size.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            points: [
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
        }
    }

    /// Smallest axis-aligned rectangle `(x, y, width, height)` containing the polygon.
    pub fn bounding_rect(&self) -> (f32, f32, f32, f32) {
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        (min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// A text fragment recognized by the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub region: Region,
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Detection {
    /// Create a detection, clamping confidence into `[0, 1]` (NaN becomes 0).
    pub fn new(region: Region, text: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            region,
            text: text.into(),
            confidence,
        }
    }
}

/// What an OCR engine reported for one image.
///
/// Engines may report "no result" rather than an empty collection; the two are
/// kept apart so the gate can tell them apart in logs and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detections", rename_all = "camelCase")]
pub enum Detections {
    /// The engine returned no result at all.
    Absent,
    /// The engine returned a (possibly empty) list, in engine order.
    Found(Vec<Detection>),
}

impl Detections {
    pub fn as_slice(&self) -> Option<&[Detection]> {
        match self {
            Detections::Absent => None,
            Detections::Found(items) => Some(items),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Detections::Absent)
    }

    pub fn len(&self) -> usize {
        self.as_slice().map_or(0, <[Detection]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Option<Vec<Detection>>> for Detections {
    fn from(value: Option<Vec<Detection>>) -> Self {
        match value {
            Some(items) => Detections::Found(items),
            None => Detections::Absent,
        }
    }
}
