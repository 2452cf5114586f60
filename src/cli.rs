//! Command-line interface for signlens
//!
//! Provides argument parsing using clap derive macros.

use crate::engine::EngineKind;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Camera-to-sign-language pipeline with per-user tic filtering
#[derive(Parser, Debug)]
#[command(
    name = "signlens",
    version,
    about = "Camera-to-sign-language pipeline with per-user tic filtering"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a frame interval.
///
/// Bare numbers are milliseconds; anything else goes through `humantime`
/// (`33ms`, `1s`, `1s500ms`).
fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let interval = match s.parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if interval.is_zero() {
        return Err("interval must be positive".to_string());
    }
    Ok(interval)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline over recorded tracker output (JSON Lines)
    Replay {
        /// Recording with one tracker result per line
        path: PathBuf,

        /// User whose tic baseline applies (default: from config)
        #[arg(long, short = 'u', value_name = "NAME")]
        user: Option<String>,

        /// Frame interval (default: from config). Examples: 33ms, 100ms, 1s
        #[arg(long, short = 'i', value_name = "DURATION", value_parser = parse_interval)]
        interval: Option<Duration>,

        /// Engine priority override (comma-separated, e.g. graph_model,hand_tracker)
        #[arg(long, value_name = "ENGINES", value_delimiter = ',')]
        engines: Vec<EngineKind>,

        /// Print the live caption instead of JSON
        #[arg(long)]
        captions: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "captions")]
        pretty: bool,
    },
    /// Print the structured output for a text phrase
    Text {
        /// Words to sign
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Print the version with the build's git commit
    Version,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}
