//! stepguard - command-line entry point
//!
//! Loads a checklist, reads evidence files and verifies one task:
//!
//! ```text
//! stepguard <checklist.txt> <task-index> [--image PATH]... [--audio PATH]...
//! ```
//!
//! The report is printed to stdout as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stepguard::alert::{AlertSink, JsonlAlertSink, TracingAlertSink};
use stepguard::llm::OpenRouterClient;
use stepguard::{Checklist, Config, EvidenceBundle, LlmEvidenceAnalyzer, VerificationEngine};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "stepguard")]
#[command(about = "Verify one checklist task against image and audio evidence", long_about = None)]
#[command(version)]
#[command(allow_negative_numbers = true)]
struct Args {
    /// Checklist text file, one task per line
    checklist: PathBuf,

    /// Zero-based index of the task to verify
    task_index: i64,

    /// Image evidence (JPEG, PNG or WEBP); repeatable
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Audio evidence (MP3 or WAV); repeatable
    #[arg(long = "audio", value_name = "PATH")]
    audio: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stepguard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    info!("Loaded configuration: model={}", config.model);

    let checklist = Checklist::load_file(&args.checklist).await?;
    if checklist.is_empty() {
        warn!(
            "Checklist {} contains no items; every verification will be out of range",
            args.checklist.display()
        );
    }

    let (evidence, skipped) = EvidenceBundle::from_paths(&args.images, &args.audio).await;
    if !skipped.is_empty() {
        warn!(
            "{} evidence files could not be used; verifying with {} images and {} audio clips",
            skipped.len(),
            evidence.images().len(),
            evidence.audio().len()
        );
    }

    let llm = Arc::new(OpenRouterClient::with_retry_config(
        config.api_key.clone(),
        config.retry.clone(),
    ));
    let analyzer = LlmEvidenceAnalyzer::new(llm, config.model.clone(), config.analyzer_timeout);
    let mut engine = VerificationEngine::new(checklist, Arc::new(analyzer));

    let report = engine.verify(args.task_index, &evidence).await;

    TracingAlertSink.record(&report).await?;
    if let Some(path) = &config.alert_log {
        if report.is_alert() {
            JsonlAlertSink::new(path)
                .record(&report)
                .await
                .with_context(|| format!("Failed to append alert to {}", path.display()))?;
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
