//! Owns one diligence session: view state, document count and panel flags.
//!
//! A run is the coordinator call and the staged progress joined together.
//! Every run gets a fresh [`RunId`]; the view only accepts stage advances and
//! the final outcome from the run it is currently showing, so a slow earlier
//! run can never overwrite a newer one.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use shared::{
    domain::{AgentId, RunId, Specialist},
    error::{AnalysisError, ErrorKind},
    protocol::{AgentResponseEnvelope, CoordinatorResult},
};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    documents::{DocumentEvent, DocumentRegistry},
    invoke::{AgentInvoker, HttpAgentClient, InvokeError},
    progress::{ProgressSimulator, Stage},
    view_model::{PanelOpenSet, ReportView},
};

/// A completed analysis, exactly as the coordinator returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub run: RunId,
    pub query: String,
    pub result: CoordinatorResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Running { run: RunId, stage: Stage },
    Success(Arc<AnalysisReport>),
    Failure { message: String, kind: ErrorKind },
}

impl ViewState {
    pub fn is_running(&self) -> bool {
        matches!(self, ViewState::Running { .. })
    }

    pub fn running_stage(&self) -> Option<Stage> {
        match self {
            ViewState::Running { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            ViewState::Failure { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            ViewState::Success(report) => Some(report),
            _ => None,
        }
    }
}

struct SessionState {
    last_run: RunId,
    active: Option<JoinHandle<()>>,
    documents: DocumentRegistry,
    panels: PanelOpenSet,
    last_query: Option<String>,
}

pub struct Orchestrator {
    invoker: Arc<dyn AgentInvoker>,
    coordinator: AgentId,
    simulator: ProgressSimulator,
    inner: Mutex<SessionState>,
    view: watch::Sender<ViewState>,
}

impl Orchestrator {
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        coordinator: AgentId,
        simulator: ProgressSimulator,
    ) -> Arc<Self> {
        let (view, _) = watch::channel(ViewState::Idle);
        Arc::new(Self {
            invoker,
            coordinator,
            simulator,
            inner: Mutex::new(SessionState {
                last_run: RunId(0),
                active: None,
                documents: DocumentRegistry::new(),
                panels: PanelOpenSet::default(),
                last_query: None,
            }),
            view,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>, InvokeError> {
        let client = HttpAgentClient::from_settings(settings)?;
        Ok(Self::new(
            Arc::new(client),
            settings.agents.coordinator.clone(),
            ProgressSimulator::new(settings.stage_interval()),
        ))
    }

    pub fn view(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    /// Starts a run for `query`. Blank queries are ignored and return `None`.
    pub async fn submit(self: &Arc<Self>, query: &str) -> Option<RunId> {
        if query.trim().is_empty() {
            debug!("ignoring blank query");
            return None;
        }

        let mut inner = self.inner.lock().await;
        let run = inner.last_run.next();
        inner.last_run = run;
        if let Some(previous) = inner.active.take() {
            previous.abort();
            debug!(%run, "superseding previous run");
        }
        inner.last_query = Some(query.to_string());

        self.view.send_replace(ViewState::Running {
            run,
            stage: Stage::Liquidity,
        });
        info!(%run, agent_id = %self.coordinator, "analysis started");

        let this = Arc::clone(self);
        let query = query.to_string();
        inner.active = Some(tokio::spawn(async move {
            this.drive(run, query).await;
        }));
        Some(run)
    }

    async fn drive(&self, run: RunId, query: String) {
        let started_at = Utc::now();
        let progress = self.simulator.run(|stage| self.advance(run, stage));
        let call = AssertUnwindSafe(self.invoker.invoke(&query, &self.coordinator)).catch_unwind();

        let ((), call) = tokio::join!(progress, call);
        let outcome = match call {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(err)) => Err(AnalysisError::unexpected(err.to_string())),
            Err(panic) => Err(AnalysisError::unexpected(panic_message(panic.as_ref()))),
        };
        self.resolve(run, query, started_at, outcome);
    }

    fn advance(&self, run: RunId, stage: Stage) {
        let applied = self.view.send_if_modified(|view| match view {
            ViewState::Running {
                run: current,
                stage: shown,
            } if *current == run && *shown != stage => {
                *shown = stage;
                true
            }
            _ => false,
        });
        if applied {
            debug!(%run, stage = stage.label(), "progress advanced");
        }
    }

    /// Moves the view out of `Running` for `run`. Outcomes of runs that are no
    /// longer displayed are dropped.
    pub fn resolve(
        &self,
        run: RunId,
        query: String,
        started_at: DateTime<Utc>,
        outcome: Result<AgentResponseEnvelope, AnalysisError>,
    ) -> bool {
        let next = match outcome.and_then(AgentResponseEnvelope::into_coordinator_result) {
            Ok(result) => {
                info!(%run, "analysis succeeded");
                ViewState::Success(Arc::new(AnalysisReport {
                    run,
                    query,
                    result,
                    started_at,
                    finished_at: Utc::now(),
                }))
            }
            Err(err) => {
                warn!(%run, kind = ?err.kind(), "analysis failed: {err}");
                ViewState::Failure {
                    message: err.display_message(),
                    kind: err.kind(),
                }
            }
        };

        let applied = self.view.send_if_modified(move |view| {
            if matches!(view, ViewState::Running { run: current, .. } if *current == run) {
                *view = next;
                true
            } else {
                false
            }
        });
        if !applied {
            debug!(%run, "discarding outcome of superseded run");
        }
        applied
    }

    /// Waits for the current run, if any, and returns the state it settled in.
    pub async fn wait_until_settled(&self) -> ViewState {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|view| !view.is_running()).await {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        };
        settled
    }

    /// Back to the empty state, cancelling any in-flight run.
    pub async fn reset(&self) {
        self.cancel_active().await;
        self.view.send_replace(ViewState::Idle);
    }

    /// Stops the in-flight run; its timers and response no longer touch the
    /// view. A finished result or error stays visible.
    pub async fn teardown(&self) {
        self.cancel_active().await;
        self.view.send_if_modified(|view| {
            if view.is_running() {
                *view = ViewState::Idle;
                true
            } else {
                false
            }
        });
    }

    async fn cancel_active(&self) {
        let mut inner = self.inner.lock().await;
        inner.last_run = inner.last_run.next();
        if let Some(active) = inner.active.take() {
            active.abort();
            debug!("cancelled in-flight run");
        }
    }

    pub async fn last_query(&self) -> Option<String> {
        self.inner.lock().await.last_query.clone()
    }

    pub async fn record_document_event(&self, event: DocumentEvent) -> usize {
        let mut inner = self.inner.lock().await;
        inner.documents.apply(event);
        inner.documents.count()
    }

    pub async fn documents(&self) -> DocumentRegistry {
        self.inner.lock().await.documents
    }

    pub async fn document_count(&self) -> usize {
        self.inner.lock().await.documents.count()
    }

    pub async fn toggle_panel(&self, panel: Specialist) -> bool {
        self.inner.lock().await.panels.toggle(panel)
    }

    pub async fn is_panel_open(&self, panel: Specialist) -> bool {
        self.inner.lock().await.panels.is_open(panel)
    }

    /// Render model of the current result, if the view shows one.
    pub async fn report_view(&self) -> Option<ReportView> {
        let view = self.view();
        let report = view.report()?;
        let inner = self.inner.lock().await;
        Some(ReportView::build(&report.result, &inner.panels))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::new()
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
