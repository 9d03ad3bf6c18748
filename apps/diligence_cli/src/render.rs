//! Plain-text rendering of the view model.

use std::fmt::Write as _;

use client_core::{
    progress::StageStatus, view_model::SpecialistPanelView, DecisionPolarity, ProgressView,
    ReportView, Severity, SAMPLE_QUESTIONS,
};

const RULE: &str = "------------------------------------------------------------";

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "[!!]",
        Severity::Warning => "[! ]",
        Severity::Normal => "[  ]",
    }
}

fn polarity_marker(polarity: DecisionPolarity) -> &'static str {
    match polarity {
        DecisionPolarity::Negative => "(negative)",
        DecisionPolarity::Positive => "(positive)",
        DecisionPolarity::Neutral => "(neutral)",
    }
}

pub fn status_line(documents_label: &str) -> String {
    format!("Knowledge base: {documents_label} indexed")
}

pub fn empty_state() -> String {
    "Ready for Diligence Analysis\nUpload your financial documents and ask a diligence question to get started."
        .to_string()
}

pub fn sample_questions() -> String {
    let mut out = String::new();
    for (i, question) in SAMPLE_QUESTIONS.iter().enumerate() {
        let _ = writeln!(out, "  {}. {question}", i + 1);
    }
    out
}

pub fn progress(view: &ProgressView) -> String {
    let stages: Vec<String> = view
        .stages
        .iter()
        .map(|(stage, status)| match status {
            StageStatus::Complete => format!("[x] {}", stage.label()),
            StageStatus::Active => format!("[>] {}", stage.label()),
            StageStatus::Pending => format!("[ ] {}", stage.label()),
        })
        .collect();
    format!("{}  {:>3}%", stages.join("  "), view.percent)
}

pub fn failure(message: &str) -> String {
    format!("Analysis error\n{RULE}\n{message}")
}

fn bullet_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

fn panel(out: &mut String, panel: &SpecialistPanelView) {
    let toggle = if panel.is_open { "v" } else { ">" };
    let _ = writeln!(out, "{toggle} {} ({})", panel.title, panel.specialist.key());
    if panel.is_open {
        let marker = if panel.unresolved { " [data not found]" } else { "" };
        let _ = writeln!(out, "    {}{marker}", panel.summary);
    }
}

pub fn report(view: &ReportView) -> String {
    let rec = &view.recommendation;
    let mut out = String::new();

    let _ = writeln!(out, "Investment Recommendation");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Decision: {} {}", rec.decision, polarity_marker(rec.polarity));

    let _ = writeln!(out, "\nExecutive Summary\n  {}", rec.executive_summary);
    let _ = writeln!(
        out,
        "\nDecision Rationale (confidence: {})\n  {}",
        rec.confidence, rec.reasoning
    );

    if !rec.red_flags.is_empty() {
        let _ = writeln!(out, "\nCritical Red Flags");
        for flag in &rec.red_flags {
            let _ = writeln!(out, "  {} {}", severity_marker(flag.severity), flag.text);
        }
    }
    bullet_section(&mut out, "Deal Killers Identified", &rec.deal_killers);

    let _ = writeln!(out, "\nKey Risks");
    for risk in &rec.key_risks {
        let _ = writeln!(out, "  - {risk}");
    }
    let _ = writeln!(out, "\nKey Opportunities");
    for opportunity in &rec.key_opportunities {
        let _ = writeln!(out, "  + {opportunity}");
    }

    let _ = writeln!(out, "\nWhat to Diligence Further");
    for bucket in &rec.actions {
        let _ = writeln!(out, "  {} ({})", bucket.title, bucket.count());
        for item in &bucket.items {
            let _ = writeln!(out, "    - {item}");
        }
    }

    if !rec.themes.is_empty() {
        let _ = writeln!(out, "\nCross-Cutting Themes\n  {}", rec.themes.join(" | "));
    }
    bullet_section(&mut out, "Valuation Considerations", &rec.valuation_considerations);

    let _ = writeln!(out, "\nDetailed Agent Analysis\n{RULE}");
    for specialist in &view.panels {
        panel(&mut out, specialist);
    }
    out
}
