//! Joining recognized fragments into one prompt input.

use crate::types::Detection;

pub const SEPARATOR: &str = " ";

/// Concatenate detection texts in the order given.
///
/// Confidence is ignored and nothing is reordered: fragments come out in
/// whatever order the engine reported them.
pub fn join(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
