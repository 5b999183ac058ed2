//! Cadence CLI
//!
//! Plays a scene of timed effects on a fixed tick and logs the eased value of
//! each attribute as it changes.

mod scene;

use anyhow::Result;
use cadence_animation::{AnimController, ControllerEvent, Strategy};
use clap::{Parser, ValueEnum};
use scene::Scene;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

/// How long a loop scene plays when no limit is given
const DEFAULT_LOOP_RUN_MS: u64 = 5000;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Play timed effects on a fixed tick", long_about = None)]
struct Cli {
    /// Scene file (TOML). The built-in demo scene is used when omitted.
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Override the scene's composition mode
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Override the tick period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Stop after this many milliseconds
    #[arg(long)]
    run_for: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Parallel,
    Serial,
    Loop,
}

impl From<Mode> for Strategy {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Parallel => Strategy::Parallel,
            Mode::Serial => Strategy::Serial,
            Mode::Loop => Strategy::Loop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut scene = match &cli.scene {
        Some(path) => Scene::load(path)?,
        None => Scene::demo(),
    };
    if let Some(mode) = cli.mode {
        scene.controller.strategy = mode.into();
    }
    if let Some(tick_ms) = cli.tick_ms {
        scene.controller.tick_interval_ms = tick_ms;
    }

    let run_for = match (cli.run_for, scene.controller.strategy) {
        (Some(ms), _) => Some(Duration::from_millis(ms)),
        (None, Strategy::Loop) => {
            tracing::info!("loop scenes never finish, stopping after {DEFAULT_LOOP_RUN_MS} ms");
            Some(Duration::from_millis(DEFAULT_LOOP_RUN_MS))
        }
        (None, _) => None,
    };

    let controller = AnimController::new(scene.controller.clone());
    for effect in scene.effects {
        controller.add(effect.into_spec());
    }

    let done = Arc::new(Notify::new());
    let notify = done.clone();
    controller.on(ControllerEvent::Done, move || notify.notify_one());

    tracing::info!(
        strategy = ?controller.strategy(),
        effects = controller.len(),
        tick_ms = controller.tick_interval().as_millis() as u64,
        "playing scene"
    );
    controller.start()?;

    let limit = async {
        match run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = done.notified() => tracing::info!("all effects done"),
        _ = limit => tracing::info!("time limit reached"),
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    controller.stop();
    tracing::info!(
        frame = controller.frame(),
        remaining = controller.len(),
        elapsed_ms = controller.elapsed().map_or(0, |d| d.as_millis() as u64),
        "stopped"
    );

    Ok(())
}
