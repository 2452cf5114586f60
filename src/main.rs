use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use signlens::cli::{Cli, Commands, ConfigAction};
use signlens::config::Config;
use signlens::engine::replay::{ReplayTracker, is_recording};
use signlens::{
    EngineAdapter, EngineKind, JsonLinesSink, LiveTextSink, Pipeline, PipelineConfig,
    PipelineState, SharedUserKey, SignSink, StructuredSignOutput, SyntheticFrameSource, UserKey,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// How long to wait for the engine to load before giving up.
const ENGINE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Replay {
            path,
            user,
            interval,
            engines,
            captions,
            pretty,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(interval) = interval {
                config.capture.interval_ms = interval.as_millis().max(1) as u64;
            }
            if !engines.is_empty() {
                config.engine.order = engines;
            }
            config.validate()?;
            run_replay(&config, &path, user.as_deref(), captions, pretty).await?;
        }
        Commands::Text { words, pretty } => {
            let output = StructuredSignOutput::from_text(&words.join(" "));
            let json = if pretty {
                serde_json::to_string_pretty(&output)?
            } else {
                output.to_json()?
            };
            println!("{json}");
        }
        Commands::Config { action } => handle_config_command(action, cli.config.as_deref())?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "signlens", &mut std::io::stdout());
        }
        Commands::Version => println!("signlens {}", signlens::version_string()),
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "signlens=info",
        (false, 2) => "signlens=debug",
        _ => "signlens=trace",
    };
    let filter = EnvFilter::try_from_env("SIGNLENS_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("signlens: failed to initialize logging: {e}");
    }
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path()?)?
    };

    Ok(config.with_env_overrides())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml_string()?);
        }
        ConfigAction::Path => {
            let path = match custom_path {
                Some(path) => PathBuf::from(path),
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Print a status line to stderr, colored when stderr is a terminal.
fn status_line(message: &str, ok: bool) {
    if !std::io::stderr().is_terminal() {
        eprintln!("{message}");
    } else if ok {
        eprintln!("{}", message.green());
    } else {
        eprintln!("{}", message.red());
    }
}

async fn run_replay(
    config: &Config,
    path: &Path,
    user: Option<&str>,
    captions: bool,
    pretty: bool,
) -> Result<()> {
    if !is_recording(path) {
        warn!(path = %path.display(), "Recording does not have a .jsonl extension");
    }
    if !config.engine.order.contains(&EngineKind::HandTracker) {
        bail!("replay needs the hand_tracker engine in the engine order");
    }

    let tracker = ReplayTracker::new(path);
    let exhausted = tracker.exhausted_flag();
    let adapter = EngineAdapter::from_config(&config.engine, Some(Box::new(tracker)), None);

    let sink: Box<dyn SignSink> = if captions {
        Box::new(LiveTextSink::new(std::io::stdout()))
    } else {
        Box::new(JsonLinesSink::new(std::io::stdout()).with_pretty(pretty || config.output.pretty_json))
    };

    let user = UserKey::resolve(Some(user.unwrap_or(&config.output.default_user)));
    debug!(user = %user, version = %signlens::version_string(), "Replaying");
    let source = SyntheticFrameSource::new(config.capture.width, config.capture.height);
    let pipeline_config = PipelineConfig {
        frame_interval: config.capture.interval(),
        ..Default::default()
    };

    let handle = Pipeline::new(pipeline_config).start_with_source(
        adapter,
        sink,
        Box::new(source),
        SharedUserKey::new(user),
    )?;

    match handle.wait_for_engine(ENGINE_LOAD_TIMEOUT) {
        PipelineState::Ready(kind) => status_line(&format!("Engine ready: {kind}"), true),
        PipelineState::Unavailable => {
            handle.stop();
            status_line("No inference engine available", false);
            bail!("could not load {}", path.display());
        }
        state => {
            handle.stop();
            bail!("engine still {state} after {ENGINE_LOAD_TIMEOUT:?}");
        }
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(20));

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                break;
            }
            _ = ticker.tick() => {
                if exhausted.load(Ordering::SeqCst) && handle.wait_idle(Duration::ZERO) {
                    break;
                }
            }
        }
    }

    let stats = handle.stop();
    status_line(&format!("Done: {stats}"), stats.inference_failures == 0);
    Ok(())
}
