//! Pool transition records.

use serde::{Deserialize, Serialize};

/// Which pool an image belongs to after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    /// Candidates for final curation.
    Selected,
    /// Failed a check or awaits manual review.
    NeedsEdit,
    /// Deleted from the library.
    Removed,
}

/// Pipeline stage that made a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Library scanner (resolution triage).
    Scan,
    /// Quality gate pass.
    Quality,
    /// Content gate pass.
    Content,
}

/// One decision about one image.
///
/// Appended to the pool journal. Directory placement stays authoritative;
/// the journal is the per-image history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEvent {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Deciding stage.
    pub stage: Stage,
    /// Image path before the decision.
    pub source: String,
    /// Image path after a copy or move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Pool the image ends up in.
    pub pool: Pool,
    /// Human-readable reason for the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_omits_empty_fields() {
        let event = PoolEvent {
            timestamp: "2024-05-01T10:00:00Z".to_string(),
            stage: Stage::Quality,
            source: "/photos/Selected/a.jpg".to_string(),
            destination: None,
            pool: Pool::Selected,
            reason: None,
        };
        let json = serde_json::to_string(&event).expect("serialize");

        assert_eq!(
            json,
            r#"{"timestamp":"2024-05-01T10:00:00Z","stage":"quality","source":"/photos/Selected/a.jpg","pool":"selected"}"#
        );
    }
}
