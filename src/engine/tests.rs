use super::*;
use crate::analyzer::Verdict;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

/// Analyzer stub: every task completes unless listed in `incomplete`.
#[derive(Default)]
struct ScriptedAnalyzer {
    incomplete: StdMutex<HashSet<String>>,
    calls: StdMutex<Vec<String>>,
    delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedAnalyzer {
    fn all_complete() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn incomplete(tasks: &[&str]) -> Arc<Self> {
        let analyzer = Self::default();
        analyzer
            .incomplete
            .lock()
            .unwrap()
            .extend(tasks.iter().map(|t| t.to_string()));
        Arc::new(analyzer)
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    fn set_complete(&self, task: &str) {
        self.incomplete.lock().unwrap().remove(task);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl EvidenceAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, task_text: &str, _evidence: &EvidenceBundle) -> Verdict {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(task_text.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let incomplete = self.incomplete.lock().unwrap().contains(task_text);
        self.active.fetch_sub(1, Ordering::SeqCst);

        if incomplete {
            Verdict::not_completed(format!("no evidence of {}", task_text))
        } else {
            Verdict::completed(format!("{} observed", task_text))
        }
    }
}

/// Analyzer whose transport always fails, reported the way the LLM adapter does.
struct BrokenAnalyzer;

#[async_trait]
impl EvidenceAnalyzer for BrokenAnalyzer {
    async fn analyze(&self, _task_text: &str, _evidence: &EvidenceBundle) -> Verdict {
        Verdict::from_failure(&crate::analyzer::AnalyzerError::Transport(
            "connection refused".to_string(),
        ))
    }
}

fn checklist(n: usize) -> Checklist {
    let text: Vec<String> = (0..n).map(|i| format!("step {}", i)).collect();
    Checklist::load(&text.join("\n"))
}

fn engine(n: usize, analyzer: Arc<ScriptedAnalyzer>) -> VerificationEngine {
    VerificationEngine::new(checklist(n), analyzer)
}

#[tokio::test]
async fn clean_advance_through_two_items() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let mut engine = engine(2, analyzer);
    let evidence = EvidenceBundle::new();

    let report = engine.verify(0, &evidence).await;
    assert_eq!(report.kind, ReportKind::CompletedInOrder);
    assert_eq!(report.detail, "step 0");
    assert_eq!(engine.current_index(), 1);

    let report = engine.verify(1, &evidence).await;
    assert_eq!(report.kind, ReportKind::CompletedInOrder);
    assert_eq!(engine.current_index(), 2);
    assert!(engine.is_finished());
    assert_eq!(engine.remaining(), 0);
}

#[tokio::test]
async fn out_of_range_indices_are_rejected_without_analysis() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let mut engine = engine(3, analyzer.clone());
    let evidence = EvidenceBundle::new();

    for index in [-1, 3, 4, i64::MAX, i64::MIN] {
        let report = engine.verify(index, &evidence).await;
        assert_eq!(report.kind, ReportKind::OutOfRange, "index {}", index);
        assert_eq!(report.task_index, index);
        assert!(!report.is_alert());
    }

    assert_eq!(engine.current_index(), 0);
    assert!(analyzer.calls().is_empty());
}

#[tokio::test]
async fn empty_checklist_rejects_everything() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let mut engine = VerificationEngine::new(Checklist::load(""), analyzer.clone());
    let evidence = EvidenceBundle::new();

    assert_eq!(engine.verify(0, &evidence).await.kind, ReportKind::OutOfRange);
    assert_eq!(engine.verify(-1, &evidence).await.kind, ReportKind::OutOfRange);
    assert_eq!(engine.current_index(), 0);
    assert!(engine.is_finished());
    assert!(analyzer.calls().is_empty());
}

#[tokio::test]
async fn skip_detection_stops_at_first_incomplete_item() {
    let analyzer = ScriptedAnalyzer::incomplete(&["step 3"]);
    let mut engine = engine(6, analyzer.clone());
    let evidence = EvidenceBundle::new();

    engine.verify(0, &evidence).await;
    engine.verify(1, &evidence).await;
    assert_eq!(engine.current_index(), 2);
    analyzer.reset_calls();

    let report = engine.verify(5, &evidence).await;

    assert_eq!(report.kind, ReportKind::Flagged);
    assert_eq!(report.task_index, 5);
    assert_eq!(report.flagged_index, Some(3));
    assert_eq!(report.detail, "'step 3' was not completed");
    assert!(report.is_alert());
    // index 2 passes, index 3 fails; 4 and the target are never analyzed
    assert_eq!(analyzer.calls(), vec!["step 2", "step 3"]);
    assert_eq!(engine.current_index(), 2);
}

#[tokio::test]
async fn flag_names_earliest_gap_not_latest() {
    let analyzer = ScriptedAnalyzer::incomplete(&["step 1", "step 3"]);
    let mut engine = engine(5, analyzer.clone());

    let report = engine.verify(4, &EvidenceBundle::new()).await;

    assert_eq!(report.kind, ReportKind::Flagged);
    assert_eq!(report.flagged_index, Some(1));
    assert_eq!(analyzer.calls(), vec!["step 0", "step 1"]);
}

#[tokio::test]
async fn skipped_items_proven_complete_allow_jump() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let mut engine = engine(5, analyzer.clone());

    let report = engine.verify(3, &EvidenceBundle::new()).await;

    assert_eq!(report.kind, ReportKind::CompletedInOrder);
    assert_eq!(report.detail, "step 3");
    assert_eq!(engine.current_index(), 4);
    assert_eq!(
        analyzer.calls(),
        vec!["step 0", "step 1", "step 2", "step 3"]
    );
}

#[tokio::test]
async fn incomplete_target_leaves_pointer_alone() {
    let analyzer = ScriptedAnalyzer::incomplete(&["step 1"]);
    let mut engine = engine(3, analyzer.clone());
    let evidence = EvidenceBundle::new();

    engine.verify(0, &evidence).await;
    let report = engine.verify(1, &evidence).await;

    assert_eq!(report.kind, ReportKind::NotCompleted);
    assert_eq!(report.detail, "no evidence of step 1");
    assert!(report.flagged_index.is_none());
    assert_eq!(engine.current_index(), 1);

    analyzer.set_complete("step 1");
    let report = engine.verify(1, &evidence).await;
    assert_eq!(report.kind, ReportKind::CompletedInOrder);
    assert_eq!(engine.current_index(), 2);
}

#[tokio::test]
async fn analyzer_failure_is_not_completed_and_keeps_pointer() {
    let mut engine = VerificationEngine::new(checklist(2), Arc::new(BrokenAnalyzer));

    let report = engine.verify(0, &EvidenceBundle::new()).await;

    assert_eq!(report.kind, ReportKind::NotCompleted);
    assert!(report.detail.contains("connection refused"));
    assert_eq!(engine.current_index(), 0);
}

#[tokio::test]
async fn analyzer_failure_during_skip_detection_flags() {
    let mut engine = VerificationEngine::new(checklist(3), Arc::new(BrokenAnalyzer));

    let report = engine.verify(2, &EvidenceBundle::new()).await;

    assert_eq!(report.kind, ReportKind::Flagged);
    assert_eq!(report.flagged_index, Some(0));
    assert_eq!(engine.current_index(), 0);
}

#[tokio::test]
async fn reverification_never_moves_pointer_backward() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let mut engine = engine(5, analyzer.clone());
    let evidence = EvidenceBundle::new();

    engine.verify(3, &evidence).await;
    assert_eq!(engine.current_index(), 4);
    analyzer.reset_calls();

    let report = engine.verify(1, &evidence).await;

    assert_eq!(report.kind, ReportKind::CompletedInOrder);
    assert_eq!(report.detail, "step 1");
    assert_eq!(engine.current_index(), 4);
    // no skip probing below the pointer, only the target itself
    assert_eq!(analyzer.calls(), vec!["step 1"]);
}

#[tokio::test]
async fn pointer_is_monotonic_across_mixed_outcomes() {
    let analyzer = ScriptedAnalyzer::incomplete(&["step 2"]);
    let mut engine = engine(6, analyzer.clone());
    let evidence = EvidenceBundle::new();

    let mut last = engine.current_index();
    for index in [0, 1, 4, 2, -3, 0, 9, 1, 3] {
        let report = engine.verify(index, &evidence).await;
        let now = engine.current_index();
        assert!(now >= last, "pointer regressed on verify({})", index);
        if report.kind != ReportKind::CompletedInOrder {
            assert_eq!(now, last, "pointer moved on {:?}", report.kind);
        }
        last = now;
    }

    assert_eq!(engine.current_index(), 2);

    analyzer.set_complete("step 2");
    let report = engine.verify(5, &evidence).await;
    assert_eq!(report.kind, ReportKind::CompletedInOrder);
    assert_eq!(engine.current_index(), 6);
    assert!(engine.is_finished());
}

#[tokio::test]
async fn finished_session_still_answers_in_range_calls() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let mut engine = engine(2, analyzer);
    let evidence = EvidenceBundle::new();

    engine.verify(1, &evidence).await;
    assert!(engine.is_finished());

    let report = engine.verify(0, &evidence).await;
    assert_eq!(report.kind, ReportKind::CompletedInOrder);
    assert_eq!(engine.current_index(), 2);
    assert_eq!(engine.verify(2, &evidence).await.kind, ReportKind::OutOfRange);
}

#[tokio::test]
async fn reports_carry_session_id() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let mut first = engine(2, analyzer.clone());
    let mut second = engine(2, analyzer);
    let evidence = EvidenceBundle::new();

    let a = first.verify(0, &evidence).await;
    let b = second.verify(0, &evidence).await;

    assert_eq!(a.session_id, first.session_id());
    assert_ne!(a.session_id, b.session_id);
}

#[tokio::test]
async fn report_serializes_snake_case_kind() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let mut engine = engine(1, analyzer);

    let report = engine.verify(0, &EvidenceBundle::new()).await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["kind"], "completed_in_order");
    assert_eq!(json["task_index"], 0);
    assert!(json.get("flagged_index").is_none());
}

#[tokio::test]
async fn shared_engine_serializes_concurrent_calls() {
    let analyzer = ScriptedAnalyzer::slow(Duration::from_millis(20));
    let shared = SharedEngine::new(engine(4, analyzer.clone()));

    let mut handles = Vec::new();
    for index in 0..4 {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move {
            shared.verify(index, &EvidenceBundle::new()).await
        }));
    }
    for handle in handles {
        let report = handle.await.unwrap();
        assert_eq!(report.kind, ReportKind::CompletedInOrder);
    }

    assert_eq!(analyzer.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(shared.state().await, EngineState { current_index: 4 });
}

#[tokio::test]
async fn independent_sessions_do_not_share_progress() {
    let analyzer = ScriptedAnalyzer::all_complete();
    let list = Arc::new(checklist(3));
    let mut first = VerificationEngine::new(list.clone(), analyzer.clone());
    let mut second = VerificationEngine::new(list, analyzer);
    let evidence = EvidenceBundle::new();

    first.verify(2, &evidence).await;

    assert_eq!(first.current_index(), 3);
    assert_eq!(second.current_index(), 0);
    assert_eq!(second.verify(0, &evidence).await.kind, ReportKind::CompletedInOrder);
    assert_eq!(second.current_index(), 1);
}
