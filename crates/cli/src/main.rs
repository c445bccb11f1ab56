mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use runtime::tools::builtin::{Add, ListFiles};
use runtime::{Message, OllamaBackend, Part, Role, Runner, ToolRegistry, ToolResult};
use storage::{Event, EventKind, RunId, RunStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "tiller.toml";

#[derive(Parser)]
#[command(name = "tiller")]
#[command(about = "A tool-using agent loop over a local model", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent once for a prompt
    Run {
        /// The question or task for the agent
        prompt: String,
        /// Model to use (overrides config and TILLER_MODEL)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// List all recorded runs
    Runs {
        /// Show only the last N runs
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show the event log for a run
    Logs {
        /// Run ID (prefix match supported)
        #[arg(short, long)]
        run: String,
        /// Filter by event kind (message, tool_call, tool_result)
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TILLER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { prompt, model } => cmd_run(prompt, model).await,
        Commands::Runs { limit } => cmd_runs(limit),
        Commands::Logs { run, kind } => cmd_logs(&run, kind.as_deref()),
    }
}

async fn cmd_run(prompt: String, model_override: Option<String>) -> Result<()> {
    let config = load_config()?;
    let model = model_override.unwrap_or_else(|| config.model());

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(Add))?;
    registry.register(Arc::new(ListFiles::default()))?;

    let backend = OllamaBackend::builder(&model)
        .base_url(config.base_url())
        .build();

    // Ctrl-C cancels at the next step boundary instead of killing mid-write.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut runner = Runner::new(backend, registry)
        .with_system(config.agent.system_prompt.clone())
        .with_cancellation(cancel);
    if let Some(timeout) = config.model_timeout() {
        runner = runner.with_model_timeout(timeout);
    }
    if let Some(timeout) = config.tool_timeout() {
        runner = runner.with_tool_timeout(timeout);
    }
    if let Some(max_turns) = config.agent.max_turns {
        runner = runner.with_max_turns(max_turns);
    }

    let store = open_or_create_store()?;
    let run_id = RunId::new();
    store.append(&Event::new(
        run_id,
        EventKind::RunStart {
            prompt: prompt.clone(),
        },
    ))?;

    println!("Run ID: {run_id}");
    println!("Model: {model}\n");

    match runner.run(prompt.as_str()).await {
        Ok(outcome) => {
            record_transcript(&store, run_id, &outcome.transcript)?;
            store.append(&Event::new(run_id, EventKind::RunEnd))?;

            tracing::debug!(
                input_tokens = outcome.usage.input_tokens,
                output_tokens = outcome.usage.output_tokens,
                "run usage"
            );
            let answer = outcome
                .transcript
                .iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .map(Message::text)
                .unwrap_or_default();
            println!("{answer}");
            Ok(())
        }
        Err(e) => {
            record_transcript(&store, run_id, &e.transcript)?;
            store.append(&Event::new(
                run_id,
                EventKind::RunAborted {
                    reason: e.kind.to_string(),
                },
            ))?;
            Err(Error::Run(e.kind))
        }
    }
}

fn cmd_runs(limit: usize) -> Result<()> {
    let store = open_store()?;
    let runs = store.list_runs()?;

    if runs.is_empty() {
        println!("No runs found.");
        return Ok(());
    }

    println!("{:<36}  {:<20}  {:<8}  STATUS", "RUN ID", "STARTED", "MSGS");
    println!("{}", "-".repeat(80));

    for summary in runs.into_iter().take(limit) {
        let started = Local
            .from_utc_datetime(&summary.started_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        let status = if summary.ended_at.is_some() {
            "ended"
        } else {
            "active"
        };
        println!(
            "{:<36}  {:<20}  {:<8}  {status}",
            summary.id, started, summary.message_count
        );
    }

    Ok(())
}

fn cmd_logs(run_prefix: &str, kind_filter: Option<&str>) -> Result<()> {
    let store = open_store()?;

    // Find run by prefix
    let runs = store.list_runs()?;
    let matching: Vec<_> = runs
        .iter()
        .filter(|r| r.id.to_string().starts_with(run_prefix))
        .collect();

    let run_id = match matching.len() {
        0 => {
            return Err(Error::RunNotFound {
                prefix: run_prefix.to_string(),
            });
        }
        1 => matching[0].id,
        _ => {
            return Err(Error::AmbiguousRun {
                prefix: run_prefix.to_string(),
                matches: matching.iter().map(|r| r.id.to_string()).collect(),
            });
        }
    };

    let events = store.load_events(run_id, kind_filter)?;

    if events.is_empty() {
        println!("No events found for run {run_id}");
        return Ok(());
    }

    println!("Run: {run_id}\n");

    for event in events {
        print_event(&event);
    }

    Ok(())
}

fn print_event(event: &Event) {
    let time = Local
        .from_utc_datetime(&event.timestamp.naive_utc())
        .format("%H:%M:%S");

    match &event.kind {
        EventKind::RunStart { prompt } => {
            println!("[{time}] === Run started: {prompt} ===");
        }
        EventKind::RunEnd => {
            println!("[{time}] === Run ended ===");
        }
        EventKind::RunAborted { reason } => {
            println!("[{time}] === Run aborted: {reason} ===");
        }
        EventKind::Message { role, content } => {
            let role_str = match role {
                storage::Role::User => "USER",
                storage::Role::Assistant => "ASSISTANT",
                storage::Role::System => "SYSTEM",
                storage::Role::Tool => "TOOL",
            };
            let display_content = truncate_display(content, 200);
            println!("[{time}] {role_str}: {display_content}");
        }
        EventKind::ToolCall {
            call_id,
            name,
            input,
        } => {
            println!("[{time}] TOOL CALL [{call_id}]: {name} {input}");
        }
        EventKind::ToolResult {
            call_id,
            output,
            is_error,
        } => {
            let tag = if *is_error { "TOOL ERROR" } else { "TOOL RESULT" };
            println!("[{time}] {tag} [{call_id}]: {output}");
        }
    }
}

/// Truncate long content for display, cutting on a character boundary.
fn truncate_display(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}...", &content[..i]),
        None => content.to_string(),
    }
}

/// Mirror a run's transcript into the event log.
fn record_transcript(store: &RunStore, run_id: RunId, transcript: &[Message]) -> Result<()> {
    for message in transcript {
        let text = message.text();
        if !text.is_empty() {
            store.append(&Event::message(
                run_id,
                to_storage_role(message.role),
                text,
            ))?;
        }
        for part in &message.parts {
            match part {
                Part::Text(_) => {}
                Part::ToolCall(call) => {
                    store.append(&Event::new(
                        run_id,
                        EventKind::ToolCall {
                            call_id: call.id.clone(),
                            name: call.name.clone(),
                            input: call.input.clone(),
                        },
                    ))?;
                }
                Part::ToolResult(result) => {
                    let (output, is_error) = match result {
                        ToolResult::Success { output, .. } => (output.clone(), false),
                        ToolResult::Failure { error, .. } => {
                            (serde_json::Value::String(error.to_string()), true)
                        }
                    };
                    store.append(&Event::new(
                        run_id,
                        EventKind::ToolResult {
                            call_id: result.tool_call_id().to_string(),
                            output,
                            is_error,
                        },
                    ))?;
                }
            }
        }
    }
    Ok(())
}

fn to_storage_role(role: Role) -> storage::Role {
    match role {
        Role::System => storage::Role::System,
        Role::User => storage::Role::User,
        Role::Assistant => storage::Role::Assistant,
        Role::Tool => storage::Role::Tool,
    }
}

fn load_config() -> Result<Config> {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        Config::load(&path).map_err(|e| Error::Config(e.to_string()))
    } else {
        Ok(Config::default())
    }
}

fn open_or_create_store() -> Result<RunStore> {
    let data_dir = dirs_data_dir().unwrap_or_else(|| ".tiller".into());
    std::fs::create_dir_all(&data_dir)?;
    Ok(RunStore::open(data_dir.join("runs.db"))?)
}

fn open_store() -> Result<RunStore> {
    let data_dir = dirs_data_dir().unwrap_or_else(|| ".tiller".into());
    let db_path = data_dir.join("runs.db");

    if !db_path.exists() {
        return Err(Error::DatabaseNotFound { path: db_path });
    }

    Ok(RunStore::open(&db_path)?)
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/tiller"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("tiller"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("tiller"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
