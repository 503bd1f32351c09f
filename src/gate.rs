//! Decides whether OCR output is worth sending to a model.

use tracing::info;

use crate::text::join;
use crate::types::Detections;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Usable text; carries the joined string.
    Pass(String),
    /// Nothing usable was recognized.
    Fail,
}

impl GateOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, GateOutcome::Pass(_))
    }
}

/// Fail on absent detections or on joined text that is empty/whitespace.
pub fn gate(detections: &Detections) -> GateOutcome {
    let Some(found) = detections.as_slice() else {
        info!("gate: engine reported no detections");
        return GateOutcome::Fail;
    };

    let joined = join(found);
    if joined.trim().is_empty() {
        info!(fragments = found.len(), "gate: recognized text is blank");
        return GateOutcome::Fail;
    }

    info!(fragments = found.len(), chars = joined.len(), "gate: pass");
    GateOutcome::Pass(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Detection, Region};

    fn found(texts: &[&str]) -> Detections {
        Detections::Found(
            texts
                .iter()
                .map(|t| Detection::new(Region::from_rect(0.0, 0.0, 1.0, 1.0), *t, 0.8))
                .collect(),
        )
    }

    #[test]
    fn absent_fails() {
        assert_eq!(gate(&Detections::Absent), GateOutcome::Fail);
    }

    #[test]
    fn empty_list_fails() {
        assert_eq!(gate(&found(&[])), GateOutcome::Fail);
    }

    #[test]
    fn whitespace_only_fragments_fail() {
        assert_eq!(gate(&found(&["", "  ", "\t\n"])), GateOutcome::Fail);
    }

    #[test]
    fn passes_with_joined_text() {
        let outcome = gate(&found(&["start", "end"]));
        assert!(outcome.passed());
        assert_eq!(outcome, GateOutcome::Pass("start end".to_string()));
    }
}
