//! Line-oriented interactive session over one orchestrator.

use std::sync::Arc;

use anyhow::Result;
use client_core::{DocumentEvent, Orchestrator, ViewState, SAMPLE_QUESTIONS};
use shared::domain::Specialist;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{render, run_query};

const HELP: &str = "\
Commands:
  <question>           run an analysis for the question
  use <n>              load sample question n into the draft
  run                  run the current draft
  questions            list sample questions
  toggle <panel>       expand/collapse liquidity | operational | sustainability | audit
  show                 print the current view
  doc-added [count]    record a finished upload (count as reported by the uploader)
  doc-removed          record a finished delete
  reset                clear the result and return to the empty state
  help                 this text
  quit                 leave";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Ask(String),
    Use(usize),
    Run,
    Questions,
    Toggle(Specialist),
    Show,
    DocAdded(Option<usize>),
    DocRemoved,
    Reset,
    Help,
    Quit,
    Invalid(String),
    Empty,
}

fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "" => ReplCommand::Empty,
        "quit" | "exit" => ReplCommand::Quit,
        "help" | "?" => ReplCommand::Help,
        "run" => ReplCommand::Run,
        "show" => ReplCommand::Show,
        "reset" => ReplCommand::Reset,
        "questions" => ReplCommand::Questions,
        "doc-removed" => ReplCommand::DocRemoved,
        "doc-added" if rest.is_empty() => ReplCommand::DocAdded(Some(1)),
        "doc-added" => match rest.parse::<usize>() {
            Ok(count) => ReplCommand::DocAdded(Some(count)),
            Err(_) if rest == "unknown" => ReplCommand::DocAdded(None),
            Err(_) => ReplCommand::Invalid(format!("not a document count: {rest}")),
        },
        "use" => match rest.parse::<usize>() {
            Ok(n) if (1..=SAMPLE_QUESTIONS.len()).contains(&n) => ReplCommand::Use(n),
            _ => ReplCommand::Invalid(format!(
                "pick a sample question between 1 and {}",
                SAMPLE_QUESTIONS.len()
            )),
        },
        "toggle" => match Specialist::from_key(rest) {
            Some(panel) => ReplCommand::Toggle(panel),
            None => ReplCommand::Invalid(format!("unknown panel: {rest}")),
        },
        _ => ReplCommand::Ask(line.to_string()),
    }
}

async fn print_view(orchestrator: &Orchestrator) {
    println!("{}", render::status_line(&orchestrator.documents().await.label()));
    match orchestrator.view() {
        ViewState::Idle => println!("{}", render::empty_state()),
        ViewState::Running { stage, .. } => println!(
            "{}",
            render::progress(&client_core::ProgressView::at(stage))
        ),
        ViewState::Failure { message, .. } => println!("{}", render::failure(&message)),
        ViewState::Success(_) => {
            if let Some(view) = orchestrator.report_view().await {
                println!("{}", render::report(&view));
            }
        }
    }
}

pub async fn run(orchestrator: Arc<Orchestrator>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft = String::new();

    println!("{HELP}\n");
    print_view(&orchestrator).await;

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Questions => print!("{}", render::sample_questions()),
            ReplCommand::Use(n) => {
                draft = SAMPLE_QUESTIONS[n - 1].to_string();
                println!("Draft: {draft}");
            }
            ReplCommand::Run => {
                let query = draft.clone();
                if run_query(&orchestrator, &query, true).await.is_some() {
                    print_view(&orchestrator).await;
                }
            }
            ReplCommand::Ask(query) => {
                draft = query;
                if run_query(&orchestrator, &draft, true).await.is_some() {
                    print_view(&orchestrator).await;
                }
            }
            ReplCommand::Toggle(panel) => {
                let open = orchestrator.toggle_panel(panel).await;
                tracing::debug!(panel = panel.key(), open, "panel toggled");
                print_view(&orchestrator).await;
            }
            ReplCommand::Show => print_view(&orchestrator).await,
            ReplCommand::DocAdded(reported_count) => {
                orchestrator
                    .record_document_event(DocumentEvent::Added { reported_count })
                    .await;
                println!("{}", render::status_line(&orchestrator.documents().await.label()));
            }
            ReplCommand::DocRemoved => {
                orchestrator
                    .record_document_event(DocumentEvent::Removed)
                    .await;
                println!("{}", render::status_line(&orchestrator.documents().await.label()));
            }
            ReplCommand::Reset => {
                orchestrator.reset().await;
                print_view(&orchestrator).await;
            }
            ReplCommand::Invalid(reason) => println!("{reason}"),
        }
    }

    orchestrator.teardown().await;
    Ok(())
}
