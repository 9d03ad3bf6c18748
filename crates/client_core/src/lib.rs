//! Client core for the diligence analysis service.
//!
//! [`Orchestrator`] is the entry point: it takes a question, calls the
//! coordinator agent through an [`AgentInvoker`], plays the staged progress
//! while the call is out, and publishes a [`ViewState`] for renderers.

pub mod classify;
pub mod config;
pub mod documents;
pub mod invoke;
pub mod orchestrator;
pub mod progress;
pub mod view_model;

pub use classify::{decision_polarity_of, is_unresolved, severity_of, DecisionPolarity, Severity};
pub use config::{load_settings, AgentDirectory, Settings};
pub use documents::{DocumentEvent, DocumentRegistry};
pub use invoke::{AgentInvoker, HttpAgentClient, InvokeError};
pub use orchestrator::{AnalysisReport, Orchestrator, ViewState};
pub use progress::{ProgressSimulator, Stage};
pub use view_model::{PanelOpenSet, ProgressView, RecommendationView, ReportView, SAMPLE_QUESTIONS};
