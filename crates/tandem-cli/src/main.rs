//! CLI entry point for tandem.
//!
//! This binary provides the `tandem` command with subcommands for serving
//! the HTTP API, running a session in the terminal, and checking status.

mod chat;
mod cli;
mod config;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use tandem_agent::CollaboratorConfig;
use tandem_intent::{PipelineResult, TerminalResult};
use tandem_store::{AnswerBatch, CheckpointStore};
use tandem_web::WebServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::chat::{ChatEnd, Prompter, Start};
use crate::cli::{Cli, Commands};
use crate::config::TandemConfig;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, port } => {
            init_tracing("info");
            cmd_serve(&cli.config, bind, port).await
        }
        Commands::Chat {
            service,
            thread,
            mode,
            answers,
            save_image,
        } => {
            init_tracing("warn");
            let answers = parse_answers(answers.as_deref())?;
            let start = match thread {
                Some(token) => Start::Resume { token, answers },
                None => Start::New {
                    service,
                    mode: mode.into(),
                    answers,
                },
            };
            cmd_chat(&cli.config, start, save_image.as_deref()).await
        }
        Commands::Status => {
            init_tracing("warn");
            cmd_status(&cli.config).await
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(config_path: &Path, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = TandemConfig::load(config_path);
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!(config = ?config, "starting tandem");
    let engine = config::build_engine(&config).await?;

    let server = WebServer::new(config.server.clone(), engine);
    info!(addr = %server.addr(), "web server ready");
    server.start().await.context("web server failed")?;

    info!("shutting down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: chat
// ---------------------------------------------------------------------------

async fn cmd_chat(config_path: &Path, start: Start, save_image: Option<&Path>) -> Result<()> {
    let config = TandemConfig::load(config_path);
    if config.uses_memory_store() {
        println!("  Note: in-memory store, this session cannot be resumed later.");
    }
    let engine = config::build_engine(&config).await?;

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    match chat::run_session(&engine, start, &mut prompter).await? {
        ChatEnd::Completed { token, result } => {
            println!();
            println!("{}", chat::render_result(&result)?);
            if let Some(path) = save_image {
                save_poster(&result, path)?;
            }
            info!(session = %token, pipeline = %result.pipeline(), "session delivered");
        }
        ChatEnd::Paused { token } => {
            println!();
            println!("  Session paused. Resume with:");
            println!("    tandem chat --service <service> --thread {token}");
        }
    }

    Ok(())
}

fn save_poster(result: &TerminalResult, path: &Path) -> Result<()> {
    let PipelineResult::Poster { image_base64, .. } = &result.payload else {
        println!("  [!] --save-image ignored: no poster was generated");
        return Ok(());
    };
    let bytes = STANDARD
        .decode(image_base64)
        .context("poster image is not valid base64")?;
    std::fs::write(path, &bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("  [+] Poster saved to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn parse_answers(raw: Option<&str>) -> Result<AnswerBatch> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("--answers must be a JSON object"),
        None => Ok(AnswerBatch::new()),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

async fn cmd_status(config_path: &Path) -> Result<()> {
    println!();
    println!("  tandem Status");
    println!("  =============");
    println!();

    if config_path.exists() {
        println!("  Config:           OK ({})", config_path.display());
    } else {
        println!("  Config:           MISSING (using defaults)");
    }
    let config = TandemConfig::load(config_path);
    println!(
        "  Server:           {}:{}",
        config.server.bind_addr, config.server.port
    );

    if config.uses_memory_store() {
        println!("  Store:            in-memory");
    } else {
        let store = config::open_store(&config).await?;
        let sessions = store.count().await.context("failed to count sessions")?;
        println!("  Store:            OK ({}, {sessions} sessions)", config.store_path);
    }

    let collaborators = config.apply_to(CollaboratorConfig::from_env());
    println!("  LLM model:        {}", collaborators.llm_model);
    for (label, value) in [
        ("GROQ_API_KEY", &collaborators.llm_api_key),
        ("HUGGINGFACE_TOKEN", &collaborators.hf_token),
        ("IMAGEGEN_API_KEY", &collaborators.image_api_key),
    ] {
        let state = if value.is_empty() { "NOT SET" } else { "CONFIGURED" };
        println!("  {label:<18}{state}");
    }

    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
