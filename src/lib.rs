//! # stepguard
//!
//! Verifies that a multi-step procedure (for example a surgical safety
//! checklist) is carried out in the prescribed order, using images and audio
//! as evidence judged by a pluggable analyzer.
//!
//! ## Architecture
//!
//! ```text
//!   checklist text ──► Checklist ─┐
//!                                 ▼
//!   EvidenceBundle ───────► VerificationEngine ──► VerificationReport ──► AlertSink
//!                                 │      ▲
//!                                 ▼      │ Verdict
//!                          EvidenceAnalyzer (LLM over OpenRouter)
//! ```
//!
//! ## Verification Flow
//! 1. Range-check the requested task index
//! 2. Re-check every skipped item between the progress pointer and the target,
//!    stopping at the first one not shown complete (flag)
//! 3. Judge the target item
//! 4. Advance the pointer only when the target is complete
//!
//! ## Modules
//! - `checklist`: Checklist parsing and loading
//! - `evidence`: Evidence bundles with validated media types
//! - `analyzer`: The analyzer contract, status-token parsing, LLM adapter
//! - `engine`: The ordered-task state machine and its reports
//! - `alert`: Sinks that receive forwarded reports
//! - `llm`: Multimodal chat-completion client

pub mod alert;
pub mod analyzer;
pub mod checklist;
pub mod config;
pub mod engine;
pub mod evidence;
pub mod llm;

pub use analyzer::{EvidenceAnalyzer, LlmEvidenceAnalyzer, Verdict};
pub use checklist::{Checklist, ChecklistItem};
pub use config::Config;
pub use engine::{ReportKind, SharedEngine, VerificationEngine, VerificationReport};
pub use evidence::{EvidenceBlob, EvidenceBundle, MediaType};
