use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, Orchestrator, ProgressView, Settings, ViewState};
use shared::domain::{KnowledgeBaseId, Specialist};
use tracing_subscriber::EnvFilter;

mod render;
mod repl;

const SAMPLE_CIM: &str = include_str!("../assets/sample_pe_deal_cim.txt");
const SAMPLE_CIM_FILE: &str = "sample_pe_deal_cim.txt";

#[derive(Parser, Debug)]
#[command(name = "diligence", about = "Run due-diligence questions against the analysis agents")]
struct Cli {
    /// TOML settings file (defaults to ./diligence.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    service_url: Option<String>,
    #[arg(long, global = true)]
    knowledge_base_id: Option<String>,
    /// Used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask one question and print the recommendation.
    Ask {
        query: Vec<String>,
        /// Print the report view as JSON instead of text.
        #[arg(long)]
        json: bool,
        /// Expand a specialist panel (liquidity, operational, sustainability, audit).
        #[arg(long = "open")]
        open: Vec<String>,
    },
    /// Interactive session.
    Repl,
    /// Write the sample CIM document for upload.
    Sample {
        #[arg(long, default_value = SAMPLE_CIM_FILE)]
        out: PathBuf,
    },
    /// Show the configured agent ids.
    Agents,
    /// List the canned sample questions.
    Questions,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = resolve_settings(&cli)?;

    match cli.command {
        Command::Ask { query, json, open } => {
            let orchestrator = build_orchestrator(&settings)?;
            for key in &open {
                let panel = parse_panel(key)?;
                orchestrator.toggle_panel(panel).await;
            }
            let terminal = run_query(&orchestrator, &query.join(" "), !json).await;
            match terminal {
                Some(ViewState::Success(_)) => {
                    if let Some(view) = orchestrator.report_view().await {
                        if json {
                            println!("{}", serde_json::to_string_pretty(&view)?);
                        } else {
                            println!("{}", render::report(&view));
                        }
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Some(ViewState::Failure { message, .. }) => {
                    eprintln!("{}", render::failure(&message));
                    Ok(ExitCode::FAILURE)
                }
                _ => {
                    eprintln!("Nothing to analyze: the question is empty.");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Repl => {
            let orchestrator = build_orchestrator(&settings)?;
            repl::run(orchestrator).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Sample { out } => {
            tokio::fs::write(&out, SAMPLE_CIM)
                .await
                .with_context(|| format!("failed to write sample CIM to '{}'", out.display()))?;
            println!("Wrote {}", out.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Agents => {
            println!("coordinator     {}", settings.agents.coordinator);
            for specialist in Specialist::ALL {
                println!(
                    "{:<15} {}",
                    specialist.key(),
                    settings.agents.specialist(specialist)
                );
            }
            println!("knowledge base  {}", settings.knowledge_base_id);
            Ok(ExitCode::SUCCESS)
        }
        Command::Questions => {
            print!("{}", render::sample_questions());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = &cli.service_url {
        settings.service_url = url.clone();
    }
    if let Some(id) = &cli.knowledge_base_id {
        settings.knowledge_base_id = KnowledgeBaseId::new(id.clone());
    }
    settings.validate()?;
    Ok(settings)
}

fn build_orchestrator(settings: &Settings) -> Result<Arc<Orchestrator>> {
    Orchestrator::from_settings(settings).context("failed to build agent client")
}

fn parse_panel(key: &str) -> Result<Specialist> {
    Specialist::from_key(key).with_context(|| {
        format!("unknown panel '{key}'; expected liquidity, operational, sustainability or audit")
    })
}

/// Submits `query` and follows the view until the run settles. Returns `None`
/// when the query was blank.
async fn run_query(
    orchestrator: &Arc<Orchestrator>,
    query: &str,
    show_progress: bool,
) -> Option<ViewState> {
    let mut rx = orchestrator.subscribe();
    let run = orchestrator.submit(query).await?;
    tracing::debug!(%run, "following run");

    loop {
        let view = rx.borrow_and_update().clone();
        match view {
            ViewState::Running { stage, .. } => {
                if show_progress {
                    eprintln!("{}", render::progress(&ProgressView::at(stage)));
                }
            }
            settled => return Some(settled),
        }
        if rx.changed().await.is_err() {
            return Some(orchestrator.view());
        }
    }
}
