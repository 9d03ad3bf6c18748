//! Render-ready projection of a coordinator result. Everything here is
//! derived on demand; nothing writes back into the result.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use shared::{domain::Specialist, protocol::CoordinatorResult};

use crate::{
    classify::{
        decision_polarity_of, display_decision, is_unresolved, severity_of, DecisionPolarity,
        Severity,
    },
    progress::{stage_percent, stage_status, Stage, StageStatus},
};

pub const NO_DATA_AVAILABLE: &str = "No data available";

pub const SAMPLE_QUESTIONS: [&str; 5] = [
    "Identify red flags in this cash flow statement",
    "What could break the model?",
    "What would you diligence further?",
    "Are there any deal killers in the financials?",
    "Analyze the sustainability of reported EBITDA",
];

/// Open/closed flag per specialist panel. Survives new analysis runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelOpenSet {
    open: BTreeMap<Specialist, bool>,
}

impl PanelOpenSet {
    pub fn is_open(&self, panel: Specialist) -> bool {
        self.open.get(&panel).copied().unwrap_or(false)
    }

    /// Flips the panel and returns its new state.
    pub fn toggle(&mut self, panel: Specialist) -> bool {
        let entry = self.open.entry(panel).or_insert(false);
        *entry = !*entry;
        *entry
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagView {
    pub text: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionBucketView {
    pub title: &'static str,
    pub items: Vec<String>,
}

impl ActionBucketView {
    pub fn count(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationView {
    pub decision: String,
    pub polarity: DecisionPolarity,
    pub confidence: String,
    pub reasoning: String,
    pub executive_summary: String,
    pub red_flags: Vec<FlagView>,
    pub deal_killers: Vec<String>,
    pub key_risks: Vec<String>,
    pub key_opportunities: Vec<String>,
    pub actions: Vec<ActionBucketView>,
    pub themes: Vec<String>,
    pub valuation_considerations: Vec<String>,
}

impl RecommendationView {
    pub fn from_result(result: &CoordinatorResult) -> Self {
        let recommendation = result.recommendation().cloned().unwrap_or_default();
        let actions = result.actions().cloned().unwrap_or_default();

        Self {
            decision: display_decision(recommendation.decision()),
            polarity: decision_polarity_of(recommendation.decision()),
            confidence: recommendation.confidence_level().to_uppercase(),
            reasoning: recommendation.reasoning().to_string(),
            executive_summary: result.executive_summary().to_string(),
            red_flags: result
                .critical_red_flags()
                .iter()
                .map(|flag| FlagView {
                    text: flag.clone(),
                    severity: severity_of(flag),
                })
                .collect(),
            deal_killers: result.deal_killers().to_vec(),
            key_risks: recommendation.key_risks().to_vec(),
            key_opportunities: recommendation.key_opportunities().to_vec(),
            actions: vec![
                ActionBucketView {
                    title: "Immediate Actions",
                    items: actions.immediate().to_vec(),
                },
                ActionBucketView {
                    title: "Before Closing",
                    items: actions.before_closing().to_vec(),
                },
                ActionBucketView {
                    title: "Post-Acquisition",
                    items: actions.post_acquisition().to_vec(),
                },
            ],
            themes: result.cross_cutting_themes().to_vec(),
            valuation_considerations: result.valuation_considerations().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecialistPanelView {
    pub specialist: Specialist,
    pub title: &'static str,
    pub summary: String,
    pub is_open: bool,
    pub unresolved: bool,
    pub severity: Severity,
}

impl SpecialistPanelView {
    pub fn build(result: &CoordinatorResult, specialist: Specialist, panels: &PanelOpenSet) -> Self {
        let summary = result
            .specialist_summary(specialist)
            .unwrap_or(NO_DATA_AVAILABLE)
            .to_string();
        Self {
            specialist,
            title: specialist.panel_title(),
            unresolved: is_unresolved(&Value::String(summary.clone())),
            severity: severity_of(&summary),
            summary,
            is_open: panels.is_open(specialist),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportView {
    pub recommendation: RecommendationView,
    pub panels: Vec<SpecialistPanelView>,
}

impl ReportView {
    pub fn build(result: &CoordinatorResult, panels: &PanelOpenSet) -> Self {
        Self {
            recommendation: RecommendationView::from_result(result),
            panels: Specialist::ALL
                .into_iter()
                .map(|specialist| SpecialistPanelView::build(result, specialist, panels))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub stages: Vec<(Stage, StageStatus)>,
    pub percent: u8,
}

impl ProgressView {
    pub fn at(current: Stage) -> Self {
        let index = current.index();
        Self {
            stages: Stage::ALL
                .into_iter()
                .map(|stage| (stage, stage_status(stage, index)))
                .collect(),
            percent: stage_percent(index),
        }
    }
}

#[cfg(test)]
#[path = "tests/view_model_tests.rs"]
mod tests;
