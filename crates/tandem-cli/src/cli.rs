//! CLI argument definitions for tandem.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tandem_intent::ExecutionMode;

/// tandem -- conversational content workflows.
#[derive(Parser)]
#[command(
    name = "tandem",
    version,
    about = "tandem -- conversational content workflows",
    long_about = "Routes a request to a poster or sales pipeline, asks the user one \
                  question per turn until enough is known, then produces the result."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind to (overrides `[server] bind`).
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides `[server] port`).
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Run one session in the terminal, answering questions on stdin.
    Chat {
        /// Service to start: `poster`, `sales`, or an app name.
        #[arg(long, short)]
        service: String,

        /// Resume an existing session instead of starting a new one.
        #[arg(long, short)]
        thread: Option<String>,

        /// Execution mode for a new session.
        #[arg(long, value_enum, default_value_t = ModeArg::Interactive)]
        mode: ModeArg,

        /// JSON object of answers supplied up front (autonomous mode).
        #[arg(long)]
        answers: Option<String>,

        /// Write the generated poster image to this file.
        #[arg(long)]
        save_image: Option<PathBuf>,
    },

    /// Show configuration, credentials and stored sessions.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Interactive,
    Autonomous,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Interactive => ExecutionMode::Interactive,
            ModeArg::Autonomous => ExecutionMode::Autonomous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_with_defaults() {
        let cli = Cli::parse_from(["tandem", "chat", "--service", "poster"]);
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        match cli.command {
            Commands::Chat {
                service,
                thread,
                mode,
                answers,
                save_image,
            } => {
                assert_eq!(service, "poster");
                assert!(thread.is_none());
                assert_eq!(mode, ModeArg::Interactive);
                assert!(answers.is_none());
                assert!(save_image.is_none());
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::parse_from(["tandem", "--config", "x.toml", "serve", "-p", "9000"]);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        match cli.command {
            Commands::Serve { bind, port } => {
                assert!(bind.is_none());
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn autonomous_mode_maps_through() {
        let cli = Cli::parse_from(["tandem", "chat", "-s", "sales", "--mode", "autonomous"]);
        let Commands::Chat { mode, .. } = cli.command else {
            panic!("expected chat");
        };
        assert_eq!(ExecutionMode::from(mode), ExecutionMode::Autonomous);
    }
}
