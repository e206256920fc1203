//! Alert sinks: where callers forward verification reports.
//!
//! The engine never writes anywhere itself. Callers decide which reports to
//! forward (usually those with [`VerificationReport::is_alert`]) and to which
//! sink.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::engine::{ReportKind, VerificationReport};

/// Receives verification reports for persistence or escalation.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn record(&self, report: &VerificationReport) -> anyhow::Result<()>;
}

/// Sink that keeps reports in memory (non-persistent).
#[derive(Clone, Default)]
pub struct InMemoryAlertSink {
    reports: Arc<RwLock<Vec<VerificationReport>>>,
}

impl InMemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reports(&self) -> Vec<VerificationReport> {
        self.reports.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }
}

#[async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn record(&self, report: &VerificationReport) -> anyhow::Result<()> {
        self.reports.write().await.push(report.clone());
        Ok(())
    }
}

/// Sink that emits reports as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn record(&self, report: &VerificationReport) -> anyhow::Result<()> {
        match report.kind {
            ReportKind::Flagged | ReportKind::NotCompleted => tracing::warn!(
                session = %report.session_id,
                task_index = report.task_index,
                "Alert: {}",
                report
            ),
            ReportKind::CompletedInOrder | ReportKind::OutOfRange => tracing::info!(
                session = %report.session_id,
                task_index = report.task_index,
                "{}",
                report
            ),
        }
        Ok(())
    }
}

/// Sink that appends one JSON object per report to a file.
#[derive(Debug, Clone)]
pub struct JsonlAlertSink {
    path: PathBuf,
}

impl JsonlAlertSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl AlertSink for JsonlAlertSink {
    async fn record(&self, report: &VerificationReport) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
