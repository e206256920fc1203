//! Evidence analyzer backed by a multimodal chat-completion model.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{AnalyzerError, EvidenceAnalyzer, Verdict};
use crate::evidence::EvidenceBundle;
use crate::llm::{ChatMessage, ChatOptions, ContentPart, LlmClient, Role};

const SYSTEM_PROMPT: &str = "You are a strict procedure-compliance auditor. \
You judge whether a single checklist step was performed, using only the supplied evidence.";

/// Analyzer that asks an LLM whether the evidence shows a task completed.
///
/// Retries for transient transport errors live in the `LlmClient`; this
/// adapter bounds the whole call with `timeout` and folds every failure into
/// a not-completed verdict.
pub struct LlmEvidenceAnalyzer {
    llm: Arc<dyn LlmClient>,
    model: String,
    timeout: Duration,
}

impl LlmEvidenceAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            llm,
            model: model.into(),
            timeout,
        }
    }

    fn build_prompt(task_text: &str, evidence: &EvidenceBundle) -> String {
        let record = if evidence.is_empty() {
            "No images or audio were supplied."
        } else {
            "The images and audio attached to this message are the only evidence."
        };

        format!(
            r#"Task to verify: {task_text}

{record}

Determine whether this specific task has been completed. Consider:
1. Does the evidence directly show the task being performed?
2. Are all required elements of the task present?
3. Is the task fully completed according to the evidence?

Begin your reply with exactly one status word, COMPLETED or NOT_COMPLETED, followed by a brief explanation."#
        )
    }

    fn build_messages(task_text: &str, evidence: &EvidenceBundle) -> Vec<ChatMessage> {
        let mut parts = vec![ContentPart::text(Self::build_prompt(task_text, evidence))];

        for image in evidence.images() {
            parts.push(ContentPart::image_url(image.to_data_url()));
        }
        for clip in evidence.audio() {
            if let Some(format) = clip.media_type().audio_format() {
                parts.push(ContentPart::input_audio(clip.to_base64(), format));
            }
        }

        vec![
            ChatMessage::new(Role::System, SYSTEM_PROMPT),
            ChatMessage::with_parts(Role::User, parts),
        ]
    }

    async fn try_analyze(
        &self,
        task_text: &str,
        evidence: &EvidenceBundle,
    ) -> Result<Verdict, AnalyzerError> {
        let messages = Self::build_messages(task_text, evidence);
        let options = ChatOptions {
            temperature: Some(0.0),
            max_tokens: Some(300),
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.llm
                .chat_completion_with_options(&self.model, &messages, options),
        )
        .await
        .map_err(|_| AnalyzerError::Timeout(self.timeout))?
        .map_err(|e| AnalyzerError::Transport(e.to_string()))?;

        let content = response.content.unwrap_or_default();
        Verdict::from_response(&content)
    }
}

#[async_trait]
impl EvidenceAnalyzer for LlmEvidenceAnalyzer {
    async fn analyze(&self, task_text: &str, evidence: &EvidenceBundle) -> Verdict {
        tracing::debug!(
            "Analyzing task '{}' with {} images, {} audio clips [{}] (model={})",
            task_text,
            evidence.images().len(),
            evidence.audio().len(),
            evidence.fingerprints().join(","),
            self.model
        );

        let result = self.try_analyze(task_text, evidence).await;
        match &result {
            Ok(verdict) => tracing::debug!(
                "Verdict for '{}': completed={}",
                task_text,
                verdict.completed
            ),
            Err(e) => tracing::warn!("Treating task '{}' as not completed: {}", task_text, e),
        }
        Verdict::from_result(result)
    }
}
