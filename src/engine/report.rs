//! Outcomes of a verification call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checklist::ChecklistItem;

/// Identifier of one monitored procedure session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// An earlier, skipped item was found not completed
    Flagged,
    /// The target item was completed; progress advanced
    CompletedInOrder,
    /// The target item was not shown completed
    NotCompleted,
    /// The requested index is not in the checklist
    OutOfRange,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::Flagged => write!(f, "flagged"),
            ReportKind::CompletedInOrder => write!(f, "completed in order"),
            ReportKind::NotCompleted => write!(f, "not completed"),
            ReportKind::OutOfRange => write!(f, "out of range"),
        }
    }
}

/// Result of one [`verify`](super::VerificationEngine::verify) call.
///
/// `task_index` is always the index the caller asked about. For `Flagged`,
/// `flagged_index` names the earliest skipped item found incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub session_id: SessionId,
    pub kind: ReportKind,
    pub task_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged_index: Option<usize>,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl VerificationReport {
    fn new(session_id: SessionId, kind: ReportKind, task_index: i64, detail: String) -> Self {
        Self {
            session_id,
            kind,
            task_index,
            flagged_index: None,
            detail,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn out_of_range(session_id: SessionId, task_index: i64, len: usize) -> Self {
        Self::new(
            session_id,
            ReportKind::OutOfRange,
            task_index,
            format!(
                "task index {} is out of range for a checklist of {} items",
                task_index, len
            ),
        )
    }

    pub(crate) fn flagged(session_id: SessionId, task_index: i64, skipped: &ChecklistItem) -> Self {
        Self {
            flagged_index: Some(skipped.index()),
            ..Self::new(
                session_id,
                ReportKind::Flagged,
                task_index,
                format!("'{}' was not completed", skipped.text()),
            )
        }
    }

    pub(crate) fn not_completed(session_id: SessionId, task_index: i64, explanation: String) -> Self {
        Self::new(session_id, ReportKind::NotCompleted, task_index, explanation)
    }

    pub(crate) fn completed_in_order(
        session_id: SessionId,
        task_index: i64,
        item: &ChecklistItem,
    ) -> Self {
        Self::new(
            session_id,
            ReportKind::CompletedInOrder,
            task_index,
            item.text().to_string(),
        )
    }

    /// Whether this outcome should be escalated to an alert sink.
    pub fn is_alert(&self) -> bool {
        matches!(self.kind, ReportKind::Flagged | ReportKind::NotCompleted)
    }
}

impl std::fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] task {}: {}", self.kind, self.task_index, self.detail)
    }
}
