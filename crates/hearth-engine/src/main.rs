//! World engine binary for the Hearth simulation.
//!
//! Wires the tick pipeline, storage, the LLM reasoner adapter, and the
//! observer API behind a small CLI:
//!
//! - `hearth init` -- generate terrain, place agents, create the database
//! - `hearth run <n>` -- advance n ticks (exit 0 on success, 2 on a
//!   storage error, 3 on a terminal reasoner error)
//! - `hearth status` -- print the world state
//! - `hearth serve` -- run continuously with the observer API attached
//!   (the default; terminal UIs are external consumers of that API)
//!
//! The engine runs on a current-thread runtime: one writer, one world,
//! cluster concurrency inside the agent-turn phase only.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hearth_core::{
    Engine, EngineConfig, EngineError, MessageNarrator, Narrator, Reasoner, ScriptedReasoner,
    runner,
};
use hearth_db::{ReadStore, Store};
use hearth_observer::AppState;
use hearth_runner::{Dialect, LlmBackend, LlmBackendConfig, LlmNarrator, LlmReasoner, PromptEngine};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for storage failures.
const EXIT_STORAGE: u8 = 2;
/// Exit code for terminal reasoner failures.
const EXIT_REASONER: u8 = 3;

/// The Hearth world engine.
#[derive(Debug, Parser)]
#[command(name = "hearth", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "hearth.yaml")]
    config: PathBuf,

    /// What to do. Defaults to `serve`.
    #[command(subcommand)]
    command: Option<Command>,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Generate terrain, place agents, and write the initial database.
    Init,
    /// Advance the world a fixed number of ticks, then exit.
    Run {
        /// How many ticks to run.
        ticks: u64,
    },
    /// Print the current world state.
    Status,
    /// Run continuously with the observer API attached.
    Serve {
        /// Observer API port.
        #[arg(long, default_value_t = 7781)]
        port: u16,
        /// Milliseconds to pause between ticks.
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve {
        port: 7781,
        interval_ms: 2000,
    }) {
        Command::Init => init(&config).await,
        Command::Run { ticks } => run(&config, ticks).await,
        Command::Status => status(&config).await,
        Command::Serve { port, interval_ms } => serve(&config, port, interval_ms).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            exit_code_for(&err)
        }
    }
}

/// Map an error to the documented exit codes.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::Storage { .. }) => ExitCode::from(EXIT_STORAGE),
        Some(EngineError::ReasonerTerminal { .. }) => ExitCode::from(EXIT_REASONER),
        _ => {
            if err.downcast_ref::<hearth_db::DbError>().is_some() {
                ExitCode::from(EXIT_STORAGE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Load the configuration, tolerating a missing file (defaults apply).
fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    if path.exists() {
        Ok(EngineConfig::from_file(path)?)
    } else {
        warn!(path = %path.display(), "no config file; using defaults");
        Ok(EngineConfig::default())
    }
}

/// `init`: generate the world and write the initial database.
async fn init(config: &EngineConfig) -> anyhow::Result<()> {
    let dir = PathBuf::from(&config.storage.data_dir);
    let store = Store::open(&dir).await?;
    if store.is_initialised().await? {
        anyhow::bail!("world at {} is already initialised", dir.display());
    }
    let state = runner::seed_world(config)?;
    store.init_world(&state).await?;
    hearth_db::status::write_status_files(&state, &dir)?;
    info!(
        dir = %dir.display(),
        agents = state.roster.len(),
        width = state.meta.width,
        height = state.meta.height,
        "world initialised"
    );
    Ok(())
}

/// `run <n>`: advance the world and exit.
async fn run(config: &EngineConfig, ticks: u64) -> anyhow::Result<()> {
    match config.reasoner.backend.as_str() {
        "scripted" => {
            let mut engine = build_engine(config, ScriptedReasoner::new(), MessageNarrator::new()).await?;
            runner::run(&mut engine, ticks).await?;
        }
        _ => {
            let (reasoner, narrator) = llm_pair(config)?;
            let mut engine = build_engine(config, reasoner, narrator).await?;
            runner::run(&mut engine, ticks).await?;
        }
    }
    Ok(())
}

/// `status`: print the world singleton.
async fn status(config: &EngineConfig) -> anyhow::Result<()> {
    let dir = PathBuf::from(&config.storage.data_dir);
    let read = ReadStore::open(&dir).await?;
    let Some(meta) = read.get_world_state().await? else {
        anyhow::bail!("world at {} is not initialised", dir.display());
    };
    let agents = read.get_all_agents().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "tick": meta.tick,
            "width": meta.width,
            "height": meta.height,
            "weather": meta.weather,
            "time_of_day": meta.time_of_day(),
            "agents": agents.iter().map(|a| a.name.to_string()).collect::<Vec<_>>(),
        }))?
    );
    Ok(())
}

/// `serve`: tick continuously with the observer API attached.
async fn serve(config: &EngineConfig, port: u16, interval_ms: u64) -> anyhow::Result<()> {
    match config.reasoner.backend.as_str() {
        "scripted" => {
            let engine = build_engine(config, ScriptedReasoner::new(), MessageNarrator::new()).await?;
            serve_loop(config, engine, port, interval_ms).await
        }
        _ => {
            let (reasoner, narrator) = llm_pair(config)?;
            let engine = build_engine(config, reasoner, narrator).await?;
            serve_loop(config, engine, port, interval_ms).await
        }
    }
}

async fn serve_loop<R: Reasoner, N: Narrator>(
    config: &EngineConfig,
    mut engine: Engine<R, N>,
    port: u16,
    interval_ms: u64,
) -> anyhow::Result<()> {
    let dir = PathBuf::from(&config.storage.data_dir);
    let read = ReadStore::open(&dir).await?;
    let app_state = Arc::new(AppState::new(read, engine.commands()));
    let _observer = hearth_observer::spawn_observer(port, app_state).await?;

    info!(port, interval_ms, "engine serving; press ctrl-c to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down at tick {}", engine.state().meta.tick);
                return Ok(());
            }
            outcome = engine.tick_once() => {
                if let Err(err) = outcome {
                    match err {
                        EngineError::Invariant { .. } => {
                            // The tick was aborted and state restored;
                            // keep serving from the last consistent tick.
                            warn!(%err, "tick aborted");
                        }
                        fatal => return Err(fatal.into()),
                    }
                }
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }
        }
    }
}

/// Open the store, load the state, and assemble an engine.
async fn build_engine<R: Reasoner, N: Narrator>(
    config: &EngineConfig,
    reasoner: R,
    narrator: N,
) -> anyhow::Result<Engine<R, N>> {
    let dir = PathBuf::from(&config.storage.data_dir);
    let store = Store::open(&dir).await?;
    if !store.is_initialised().await? {
        anyhow::bail!("world at {} is not initialised; run `hearth init` first", dir.display());
    }
    let state = store.load().await?;
    info!(tick = state.meta.tick, agents = state.roster.len(), "world loaded");
    Ok(Engine::new(config.clone(), state, store, reasoner, narrator))
}

/// Build the LLM reasoner and narrator from configuration.
fn llm_pair(config: &EngineConfig) -> anyhow::Result<(LlmReasoner, LlmNarrator)> {
    let api_key = std::env::var(&config.reasoner.api_key_env).map_err(|_| {
        anyhow::anyhow!(
            "reasoner API key not found in ${}",
            config.reasoner.api_key_env
        )
    })?;

    let dialect = Dialect::resolve(&config.reasoner.backend);
    let backend_for = |model: &str| {
        LlmBackend::new(
            dialect,
            LlmBackendConfig {
                api_url: config.reasoner.api_url.clone(),
                api_key: api_key.clone(),
                model: model.to_owned(),
                max_output_tokens: config.reasoner.max_output_tokens,
                request_timeout_secs: config.reasoner.request_timeout_secs,
            },
        )
        .map_err(|e| anyhow::anyhow!(e))
    };

    let prompts = |dir: &str| {
        if dir.is_empty() {
            PromptEngine::builtin()
        } else {
            PromptEngine::from_dir(dir)
        }
    };

    // Agents may use different models; the reasoner model comes from each
    // agent's row, so the backend here carries the first seed's model as
    // the session default.
    let default_model = config
        .world
        .agents
        .first()
        .map_or("claude-sonnet-4-5", |a| a.model_id.as_str());

    let reasoner = LlmReasoner::new(
        backend_for(default_model)?,
        prompts(&config.reasoner.templates_dir).map_err(|e| anyhow::anyhow!(e))?,
    );

    let narrator_backend = if config.reasoner.narrator_model.is_empty() {
        None
    } else {
        Some(backend_for(&config.reasoner.narrator_model)?)
    };
    let narrator = LlmNarrator::new(
        narrator_backend,
        prompts(&config.reasoner.templates_dir).map_err(|e| anyhow::anyhow!(e))?,
    );

    Ok((reasoner, narrator))
}
