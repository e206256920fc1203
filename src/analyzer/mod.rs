//! Evidence analysis: judging whether one checklist task is shown complete
//! by an evidence bundle.
//!
//! # Status tokens
//! Analyzer replies must *begin* with exactly `COMPLETED` or `NOT_COMPLETED`
//! (case-insensitive). Any other leading token is ambiguous and counts as not
//! completed. A substring test is never used: `"COMPLETED"` occurs inside
//! `"NOT_COMPLETED"`.
//!
//! # Failure absorption
//! [`EvidenceAnalyzer::analyze`] is infallible by signature. Transport errors,
//! timeouts and unparseable replies become a not-completed [`Verdict`] whose
//! explanation carries the failure detail.

mod llm;

pub use llm::LlmEvidenceAnalyzer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::evidence::EvidenceBundle;

/// Reasons an analysis could not produce a clean status.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Evidence analysis transport failure: {0}")]
    Transport(String),

    #[error("Evidence analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Evidence analysis returned an empty response")]
    EmptyResponse,

    #[error("Ambiguous analyzer response (no COMPLETED/NOT_COMPLETED status token): {0}")]
    Ambiguous(String),
}

/// Completion judgment for one task given one evidence bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub completed: bool,
    pub explanation: String,
}

impl Verdict {
    pub fn completed(explanation: impl Into<String>) -> Self {
        Self {
            completed: true,
            explanation: explanation.into(),
        }
    }

    pub fn not_completed(explanation: impl Into<String>) -> Self {
        Self {
            completed: false,
            explanation: explanation.into(),
        }
    }

    /// Convert an analysis failure into a not-completed verdict.
    pub fn from_failure(error: &AnalyzerError) -> Self {
        Self::not_completed(error.to_string())
    }

    /// Collapse a fallible analysis into a verdict, failing toward not completed.
    pub fn from_result(result: Result<Verdict, AnalyzerError>) -> Self {
        match result {
            Ok(verdict) => verdict,
            Err(e) => Self::from_failure(&e),
        }
    }

    /// Classify a raw analyzer reply by its leading status token.
    pub fn from_response(text: &str) -> Result<Self, AnalyzerError> {
        if text.trim().is_empty() {
            return Err(AnalyzerError::EmptyResponse);
        }

        let (status, rest) = split_status(text);
        let explanation = if rest.is_empty() {
            text.trim().to_string()
        } else {
            rest.to_string()
        };

        match status {
            StatusToken::Completed => Ok(Self::completed(explanation)),
            StatusToken::NotCompleted => Ok(Self::not_completed(explanation)),
            StatusToken::Ambiguous => Err(AnalyzerError::Ambiguous(text.trim().to_string())),
        }
    }
}

/// Leading status token of an analyzer reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusToken {
    Completed,
    NotCompleted,
    Ambiguous,
}

impl StatusToken {
    pub fn parse(text: &str) -> Self {
        split_status(text).0
    }
}

/// Split a reply into its status token and the explanation after it.
///
/// The token is the first whitespace-separated word with surrounding markdown
/// emphasis (`*`, `` ` ``, quotes) and at most one trailing `:`, `.` or `,`
/// removed. It must then equal a status literal exactly; `COMPLETED?` or
/// `COMPLETED/NOT_COMPLETED` are ambiguous.
fn split_status(text: &str) -> (StatusToken, &str) {
    let body = text.trim_start();
    let word_len = body.find(char::is_whitespace).unwrap_or(body.len());
    let (word, rest) = body.split_at(word_len);

    let is_emphasis = |c: char| matches!(c, '*' | '`' | '"' | '\'');
    let word = word.trim_start_matches(is_emphasis).trim_end_matches(is_emphasis);
    let word = word
        .strip_suffix(|c: char| matches!(c, ':' | '.' | ','))
        .unwrap_or(word)
        .trim_end_matches(is_emphasis);

    let status = if word.eq_ignore_ascii_case("COMPLETED") {
        StatusToken::Completed
    } else if word.eq_ignore_ascii_case("NOT_COMPLETED") {
        StatusToken::NotCompleted
    } else {
        StatusToken::Ambiguous
    };

    let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-'));

    (status, rest.trim_end())
}

/// Judges task completion from evidence.
///
/// Implementations are expected to be slow (a network round trip). They must
/// not fail: every error is reported as a not-completed verdict.
#[async_trait]
pub trait EvidenceAnalyzer: Send + Sync {
    async fn analyze(&self, task_text: &str, evidence: &EvidenceBundle) -> Verdict;
}
