use super::*;
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    error::ANALYSIS_FAILED,
    protocol::ResultPayload,
};
use std::{collections::VecDeque, time::Duration};
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_millis(800);

enum Reply {
    Envelope(AgentResponseEnvelope),
    CallerError,
    Panic(&'static str),
}

struct Step {
    delay: Duration,
    reply: Reply,
}

struct ScriptedInvoker {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(String, AgentId)>>,
}

impl ScriptedInvoker {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        query: &str,
        agent_id: &AgentId,
    ) -> Result<AgentResponseEnvelope, InvokeError> {
        self.calls
            .lock()
            .await
            .push((query.to_string(), agent_id.clone()));
        let step = self.script.lock().await.pop_front();
        let Some(step) = step else {
            return Ok(AgentResponseEnvelope::failed("script exhausted"));
        };
        tokio::time::sleep(step.delay).await;
        match step.reply {
            Reply::Envelope(envelope) => Ok(envelope),
            Reply::CallerError => Err(InvokeError::EmptyAgentId),
            Reply::Panic(message) => panic!("{message}"),
        }
    }
}

fn coordinator_json() -> Value {
    json!({
        "executive_summary": "Stable operator with thin liquidity headroom.",
        "agent_findings": {
            "liquidity_summary": "Runway of 7 months.",
            "operational_summary": "Margins expanding.",
            "sustainability_summary": "Data not found for FY23",
            "audit_summary": "Clean opinion."
        },
        "cross_cutting_themes": ["Working capital"],
        "critical_red_flags": ["High customer concentration"],
        "investment_recommendation": {
            "decision": "proceed_with_caution",
            "confidence_level": "medium",
            "reasoning": "Fundamentals hold.",
            "key_risks": ["Refinancing"],
            "key_opportunities": ["Pricing"]
        },
        "required_actions": {
            "immediate": ["Monthly cash flow"],
            "before_closing": [],
            "post_acquisition": ["Lease renegotiation"]
        },
        "deal_killers_identified": [],
        "valuation_considerations": ["Normalize EBITDA"]
    })
}

fn success(delay: Duration) -> Step {
    Step {
        delay,
        reply: Reply::Envelope(AgentResponseEnvelope::succeeded(ResultPayload::new(
            coordinator_json(),
        ))),
    }
}

fn failure(delay: Duration, message: &str) -> Step {
    Step {
        delay,
        reply: Reply::Envelope(AgentResponseEnvelope::failed(message)),
    }
}

fn orchestrator(invoker: Arc<ScriptedInvoker>) -> Arc<Orchestrator> {
    Orchestrator::new(
        invoker,
        AgentId::new("coordinator"),
        ProgressSimulator::new(INTERVAL),
    )
}

/// Follows the view until it leaves `Running`, collecting the stages shown.
fn collect_stages(orchestrator: &Arc<Orchestrator>) -> JoinHandle<(Vec<Stage>, ViewState)> {
    let mut rx = orchestrator.subscribe();
    tokio::spawn(async move {
        let mut stages = Vec::new();
        loop {
            let view = rx.borrow_and_update().clone();
            match view {
                ViewState::Running { stage, .. } => {
                    if stages.last() != Some(&stage) {
                        stages.push(stage);
                    }
                }
                other => return (stages, other),
            }
            if rx.changed().await.is_err() {
                return (stages, ViewState::Idle);
            }
        }
    })
}

#[tokio::test(start_paused = true)]
async fn blank_query_is_a_no_op() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::ZERO)]);
    let orchestrator = orchestrator(invoker.clone());

    assert_eq!(orchestrator.submit("").await, None);
    assert_eq!(orchestrator.submit("  \n\t ").await, None);

    assert_eq!(orchestrator.view(), ViewState::Idle);
    assert!(invoker.calls.lock().await.is_empty());
    assert_eq!(orchestrator.last_query().await, None);
}

#[tokio::test(start_paused = true)]
async fn submit_enters_running_at_first_stage_immediately() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::ZERO)]);
    let orchestrator = orchestrator(invoker.clone());

    let run = orchestrator
        .submit("What could break the model?")
        .await
        .expect("run started");

    assert_eq!(
        orchestrator.view(),
        ViewState::Running {
            run,
            stage: Stage::Liquidity
        }
    );
    assert_eq!(
        orchestrator.last_query().await.as_deref(),
        Some("What could break the model?")
    );
}

#[tokio::test(start_paused = true)]
async fn fast_response_still_shows_every_stage() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::ZERO)]);
    let orchestrator = orchestrator(invoker.clone());
    let started = Instant::now();

    orchestrator.submit("Any deal killers?").await.expect("run");
    let (stages, terminal) = collect_stages(&orchestrator).await.expect("collector");

    assert_eq!(stages, Stage::ALL.to_vec());
    assert!(matches!(terminal, ViewState::Success(_)));
    assert!(started.elapsed() >= INTERVAL * Stage::COUNT as u32);

    let calls = invoker.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Any deal killers?");
    assert_eq!(calls[0].1.as_str(), "coordinator");
}

#[tokio::test(start_paused = true)]
async fn slow_response_holds_at_synthesis() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::from_secs(10))]);
    let orchestrator = orchestrator(invoker);
    let started = Instant::now();

    orchestrator.submit("Analyze EBITDA").await.expect("run");
    tokio::time::sleep(Duration::from_millis(6_000)).await;
    assert_eq!(orchestrator.view().running_stage(), Some(Stage::Synthesis));

    let terminal = orchestrator.wait_until_settled().await;
    assert!(matches!(terminal, ViewState::Success(_)));
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(terminal.running_stage(), None);
}

#[tokio::test(start_paused = true)]
async fn success_exposes_result_unchanged() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::from_millis(100))]);
    let orchestrator = orchestrator(invoker);

    let run = orchestrator.submit("Identify red flags").await.expect("run");
    let terminal = orchestrator.wait_until_settled().await;

    let report = terminal.report().expect("success");
    assert_eq!(report.run, run);
    assert_eq!(report.query, "Identify red flags");
    assert!(report.finished_at >= report.started_at);
    assert_eq!(
        serde_json::to_value(&report.result).expect("serialize"),
        coordinator_json()
    );
}

#[tokio::test(start_paused = true)]
async fn service_failure_message_is_shown_verbatim() {
    let invoker = ScriptedInvoker::new(vec![failure(Duration::ZERO, "Service unavailable")]);
    let orchestrator = orchestrator(invoker);

    orchestrator.submit("q").await.expect("run");
    let terminal = orchestrator.wait_until_settled().await;

    assert_eq!(
        terminal,
        ViewState::Failure {
            message: "Service unavailable".to_string(),
            kind: ErrorKind::Transport,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn failure_without_message_uses_fallback() {
    let envelope = AgentResponseEnvelope {
        success: false,
        response: None,
        error: None,
    };
    let invoker = ScriptedInvoker::new(vec![Step {
        delay: Duration::ZERO,
        reply: Reply::Envelope(envelope),
    }]);
    let orchestrator = orchestrator(invoker);

    orchestrator.submit("q").await.expect("run");
    let terminal = orchestrator.wait_until_settled().await;
    assert_eq!(terminal.failure_message(), Some(ANALYSIS_FAILED));
}

#[tokio::test(start_paused = true)]
async fn success_without_agent_findings_is_a_failure() {
    let invoker = ScriptedInvoker::new(vec![Step {
        delay: Duration::ZERO,
        reply: Reply::Envelope(AgentResponseEnvelope::succeeded(ResultPayload::new(json!({
            "executive_summary": "partial answer"
        })))),
    }]);
    let orchestrator = orchestrator(invoker);

    orchestrator.submit("q").await.expect("run");
    let terminal = orchestrator.wait_until_settled().await;
    assert_eq!(
        terminal,
        ViewState::Failure {
            message: ANALYSIS_FAILED.to_string(),
            kind: ErrorKind::MalformedResult,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn caller_error_becomes_failure() {
    let invoker = ScriptedInvoker::new(vec![Step {
        delay: Duration::ZERO,
        reply: Reply::CallerError,
    }]);
    let orchestrator = orchestrator(invoker);

    orchestrator.submit("q").await.expect("run");
    let terminal = orchestrator.wait_until_settled().await;
    assert_eq!(
        terminal,
        ViewState::Failure {
            message: "agent id must not be empty".to_string(),
            kind: ErrorKind::Unexpected,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn panicking_invoker_is_absorbed() {
    let invoker = ScriptedInvoker::new(vec![Step {
        delay: Duration::ZERO,
        reply: Reply::Panic("connector blew up"),
    }]);
    let orchestrator = orchestrator(invoker);

    orchestrator.submit("q").await.expect("run");
    let terminal = orchestrator.wait_until_settled().await;
    assert_eq!(terminal.failure_message(), Some("connector blew up"));
}

#[tokio::test(start_paused = true)]
async fn second_run_is_not_overwritten_by_first() {
    let invoker = ScriptedInvoker::new(vec![
        success(Duration::from_secs(10)),
        failure(Duration::ZERO, "second run failed"),
    ]);
    let orchestrator = orchestrator(invoker.clone());

    let first = orchestrator.submit("first").await.expect("first run");
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let second = orchestrator.submit("second").await.expect("second run");
    assert!(second > first);
    assert_eq!(
        orchestrator.view(),
        ViewState::Running {
            run: second,
            stage: Stage::Liquidity
        }
    );

    let terminal = orchestrator.wait_until_settled().await;
    assert_eq!(terminal.failure_message(), Some("second run failed"));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(orchestrator.view().failure_message(), Some("second run failed"));
    assert_eq!(invoker.calls.lock().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_outcome_is_discarded() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::from_secs(60))]);
    let orchestrator = orchestrator(invoker);

    let run = orchestrator.submit("q").await.expect("run");
    let applied = orchestrator.resolve(
        RunId(run.0 + 7),
        "q".into(),
        Utc::now(),
        Ok(AgentResponseEnvelope::failed("stale")),
    );

    assert!(!applied);
    assert!(orchestrator.view().is_running());
}

#[tokio::test(start_paused = true)]
async fn new_run_clears_previous_failure() {
    let invoker = ScriptedInvoker::new(vec![
        failure(Duration::ZERO, "first failed"),
        success(Duration::ZERO),
    ]);
    let orchestrator = orchestrator(invoker);

    orchestrator.submit("q1").await.expect("run");
    orchestrator.wait_until_settled().await;
    assert_eq!(orchestrator.view().failure_message(), Some("first failed"));

    orchestrator.submit("q2").await.expect("run");
    assert!(orchestrator.view().is_running());
    assert_eq!(orchestrator.view().failure_message(), None);

    let terminal = orchestrator.wait_until_settled().await;
    assert!(terminal.report().is_some());
}

#[tokio::test(start_paused = true)]
async fn panel_flags_survive_new_runs() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::ZERO), success(Duration::ZERO)]);
    let orchestrator = orchestrator(invoker);

    assert!(orchestrator.toggle_panel(Specialist::Liquidity).await);
    orchestrator.submit("q1").await.expect("run");
    orchestrator.wait_until_settled().await;
    orchestrator.submit("q2").await.expect("run");
    orchestrator.wait_until_settled().await;

    assert!(orchestrator.is_panel_open(Specialist::Liquidity).await);
    let view = orchestrator.report_view().await.expect("report view");
    assert!(view.panels[0].is_open);
    assert!(!view.panels[1].is_open);
    assert!(view.panels[2].unresolved);
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_run_and_returns_to_idle() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::from_secs(2))]);
    let orchestrator = orchestrator(invoker);

    orchestrator.submit("q").await.expect("run");
    tokio::time::sleep(Duration::from_millis(900)).await;
    orchestrator.reset().await;
    assert_eq!(orchestrator.view(), ViewState::Idle);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(orchestrator.view(), ViewState::Idle);
}

#[tokio::test(start_paused = true)]
async fn teardown_keeps_finished_result() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::ZERO)]);
    let orchestrator = orchestrator(invoker);

    orchestrator.submit("q").await.expect("run");
    orchestrator.wait_until_settled().await;
    orchestrator.teardown().await;
    assert!(orchestrator.view().report().is_some());
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_run_ignores_late_progress_and_response() {
    let invoker = ScriptedInvoker::new(vec![success(Duration::from_secs(2))]);
    let orchestrator = orchestrator(invoker);
    let mut rx = orchestrator.subscribe();

    orchestrator.submit("q").await.expect("run");
    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
    assert_eq!(orchestrator.view().running_stage(), Some(Stage::Operational));

    orchestrator.teardown().await;
    assert_eq!(orchestrator.view(), ViewState::Idle);
    rx.borrow_and_update();

    tokio::time::sleep(INTERVAL * 10).await;
    assert_eq!(orchestrator.view(), ViewState::Idle);
    assert!(!rx.has_changed().expect("sender alive"));
}

#[tokio::test]
async fn document_events_are_counted_and_clamped() {
    let orchestrator = orchestrator(ScriptedInvoker::new(Vec::new()));

    assert_eq!(orchestrator.record_document_event(DocumentEvent::Removed).await, 0);
    assert_eq!(
        orchestrator
            .record_document_event(DocumentEvent::Added {
                reported_count: Some(1)
            })
            .await,
        1
    );
    assert_eq!(orchestrator.document_count().await, 1);
    assert_eq!(orchestrator.documents().await.label(), "1 document");
}
