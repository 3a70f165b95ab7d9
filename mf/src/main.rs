//! MindFlow - brain dump to task list
//!
//! CLI entry point for the HTTP server and one-shot extraction.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, bail};
use tokio::net::TcpListener;
use tracing::{debug, info};

use mindflow::cli::{Cli, Command, OutputFormat, get_log_path};
use mindflow::config::Config;
use mindflow::domain::{Priority, Status, Task};
use mindflow::extract::{Extractor, LlmInvoker, ModelInvoker, RemoteInvoker};
use mindflow::llm::create_client;
use mindflow::server::{self, AppState};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = ?config.llm.model, "MindFlow loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve { bind } => cmd_serve(&config, bind).await,
        Command::Dump { text, server, format } => cmd_dump(&config, text, server, format).await,
    }
}

async fn cmd_serve(config: &Config, bind: Option<std::net::SocketAddr>) -> Result<()> {
    let addr = bind.unwrap_or(config.server.bind);
    debug!(%addr, "cmd_serve: called");

    let state = AppState::from_config(config)?;
    let listener = TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind {}", addr))?;

    println!("MindFlow listening on http://{}", listener.local_addr()?);

    server::serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("cmd_serve: shutdown signal received");
    })
    .await
}

/// Read the brain dump from the argument, or stdin for `-` / absent
fn read_input(text: Option<String>) -> Result<String> {
    match text {
        Some(text) if text != "-" => Ok(text),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

async fn cmd_dump(config: &Config, text: Option<String>, server: Option<String>, format: OutputFormat) -> Result<()> {
    let input = read_input(text)?;
    if input.trim().is_empty() {
        bail!("Text is required");
    }
    debug!(input_len = input.len(), ?server, "cmd_dump: called");

    let invoker: Arc<dyn ModelInvoker> = match server {
        Some(url) => Arc::new(RemoteInvoker::new(&url)),
        None => {
            let client = create_client(&config.llm).context("Failed to create LLM client")?;
            Arc::new(LlmInvoker::new(
                client,
                config.extraction.categories.clone(),
                config.llm.max_tokens,
            ))
        }
    };

    let extractor = Extractor::new(invoker, config.extraction.timeout());
    let extraction = extractor.run(&input).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&extraction.tasks)?);
        }
        OutputFormat::Text => {
            if let Some(reason) = extraction.fallback {
                eprintln!("{} automatic extraction failed ({})", "warning:".yellow().bold(), reason);
            }
            if extraction.tasks.is_empty() {
                println!("No tasks found.");
            }
            for task in &extraction.tasks {
                print_task(task);
            }
        }
    }

    Ok(())
}

fn print_task(task: &Task) {
    let priority = match task.priority {
        Priority::High => task.priority.to_string().red(),
        Priority::Medium => task.priority.to_string().yellow(),
        Priority::Low => task.priority.to_string().green(),
    };
    let status = match task.status {
        Status::Done => task.status.to_string().green(),
        _ => task.status.to_string().normal(),
    };

    println!("{} [{}] {} ({})", "*".cyan(), task.category.bold(), task.title, priority);
    println!("    status: {}", status);
    if let Some(notes) = &task.notes {
        println!("    notes:  {}", notes.dimmed());
    }
}
