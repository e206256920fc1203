//! Ordered-task verification state machine.
//!
//! The engine holds a progress pointer (`current_index`): the index of the
//! next checklist item the session expects to see completed. Each
//! [`VerificationEngine::verify`] call either advances it, leaves it alone,
//! or rejects the request.
//!
//! # State Machine
//! ```text
//!   current_index ∈ [0, len]
//!
//!   verify(t):
//!     t ∉ [0, len)                              → OutOfRange
//!     ∃ i ∈ [current, t) not completed (first)  → Flagged(i)
//!     target not completed                      → NotCompleted
//!     target completed                          → CompletedInOrder,
//!                                                 current = max(current, t + 1)
//! ```
//!
//! # Invariants
//! - `current_index` never decreases
//! - `current_index` only changes on a `CompletedInOrder` outcome
//! - Skipped items are checked in ascending order and checking stops at the
//!   first incomplete one, so a flag always names the earliest gap
//!
//! Re-verifying an already-passed item runs the analyzer as usual but clamps
//! the pointer, so it can never move backward.

mod report;

pub use report::{ReportKind, SessionId, VerificationReport};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::analyzer::EvidenceAnalyzer;
use crate::checklist::Checklist;
use crate::evidence::EvidenceBundle;

/// Snapshot of the engine's mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub current_index: usize,
}

/// Verifies that checklist items are completed in order.
///
/// `verify` takes `&mut self`: calls against one engine are serialized by
/// construction. Use [`SharedEngine`] when a session must be driven from
/// several tasks.
pub struct VerificationEngine {
    session_id: SessionId,
    checklist: Arc<Checklist>,
    analyzer: Arc<dyn EvidenceAnalyzer>,
    current_index: usize,
}

impl VerificationEngine {
    /// Bind a checklist and an analyzer into a fresh session at index 0.
    pub fn new(checklist: impl Into<Arc<Checklist>>, analyzer: Arc<dyn EvidenceAnalyzer>) -> Self {
        let checklist = checklist.into();
        let session_id = SessionId::new();
        tracing::info!(
            "Started verification session {} with {} checklist items",
            session_id,
            checklist.len()
        );

        Self {
            session_id,
            checklist,
            analyzer,
            current_index: 0,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn checklist(&self) -> &Arc<Checklist> {
        &self.checklist
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            current_index: self.current_index,
        }
    }

    /// All items have been verified in order.
    pub fn is_finished(&self) -> bool {
        self.current_index >= self.checklist.len()
    }

    /// Number of items not yet verified.
    pub fn remaining(&self) -> usize {
        self.checklist.len().saturating_sub(self.current_index)
    }

    /// Verify that the item at `task_index` is complete, given `evidence`.
    ///
    /// Every item between the progress pointer and `task_index` is first
    /// checked with the same evidence; the first incomplete one is flagged and
    /// nothing else is evaluated. Analyzer failures arrive as not-completed
    /// verdicts and never abort the call.
    pub async fn verify(&mut self, task_index: i64, evidence: &EvidenceBundle) -> VerificationReport {
        let Some(target) = usize::try_from(task_index)
            .ok()
            .filter(|i| *i < self.checklist.len())
        else {
            tracing::warn!(
                "Session {}: task index {} out of range (checklist has {} items)",
                self.session_id,
                task_index,
                self.checklist.len()
            );
            return VerificationReport::out_of_range(
                self.session_id,
                task_index,
                self.checklist.len(),
            );
        };

        for skipped in self.current_index..target {
            let item = &self.checklist.items()[skipped];
            let verdict = self.analyzer.analyze(item.text(), evidence).await;
            if !verdict.completed {
                tracing::warn!(
                    "Session {}: flagging '{}' (index {}) while verifying index {}: {}",
                    self.session_id,
                    item.text(),
                    skipped,
                    target,
                    verdict.explanation
                );
                return VerificationReport::flagged(self.session_id, task_index, item);
            }
        }

        let item = &self.checklist.items()[target];
        let verdict = self.analyzer.analyze(item.text(), evidence).await;

        if !verdict.completed {
            tracing::info!(
                "Session {}: '{}' not completed: {}",
                self.session_id,
                item.text(),
                verdict.explanation
            );
            return VerificationReport::not_completed(self.session_id, task_index, verdict.explanation);
        }

        let next = target + 1;
        if next > self.current_index {
            self.current_index = next;
        }
        tracing::info!(
            "Session {}: '{}' completed, progress {}/{}",
            self.session_id,
            item.text(),
            self.current_index,
            self.checklist.len()
        );

        VerificationReport::completed_in_order(self.session_id, task_index, item)
    }
}

/// A verification engine shared between tasks.
///
/// The lock is held for the whole `verify` call, including every analyzer
/// round trip, so two calls never interleave on the progress pointer.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<VerificationEngine>>,
}

impl SharedEngine {
    pub fn new(engine: VerificationEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn verify(&self, task_index: i64, evidence: &EvidenceBundle) -> VerificationReport {
        self.inner.lock().await.verify(task_index, evidence).await
    }

    pub async fn state(&self) -> EngineState {
        self.inner.lock().await.state()
    }
}

#[cfg(test)]
mod tests;
