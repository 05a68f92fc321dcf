//! xrscene - headless runner for XR interaction behaviors
//!
//! Loads a TOML scene, plays a JSON script of host events against it and
//! writes every behavior event to a JSONL log.

mod config;
mod headless;
mod script;
mod stage;

use anyhow::Result;
use std::{env, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting xrscene v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    if cli.help {
        print_usage();
        return Ok(());
    }
    let Some(scene) = cli.scene else {
        print_usage();
        anyhow::bail!("--scene is required");
    };
    if cli.audio && !cfg!(feature = "rodio_backend") {
        tracing::warn!("--audio has no effect without the rodio_backend feature");
    }

    let summary = headless::run(headless::HeadlessConfig {
        scene,
        script: cli.script,
        event_log: cli.event_log,
        dt: cli.dt,
        max_ticks: cli.max_ticks,
        audio: cli.audio,
    })?;

    info!(
        ticks = summary.ticks,
        events = summary.events,
        disabled = ?summary.disabled,
        "run finished"
    );
    Ok(())
}

fn print_usage() {
    eprintln!(
        "usage: xrscene --scene <scene.toml> [--script <script.json>] [--event-log <events.jsonl>] \
         [--dt <seconds>] [--max-ticks <n>] [--audio]"
    );
}

#[derive(Debug, Default)]
struct CliOptions {
    help: bool,
    scene: Option<PathBuf>,
    script: Option<PathBuf>,
    event_log: Option<PathBuf>,
    dt: Option<f32>,
    max_ticks: Option<u64>,
    audio: bool,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => opts.help = true,
                "--audio" => opts.audio = true,
                "--scene" => match args.next() {
                    Some(path) => opts.scene = Some(PathBuf::from(path)),
                    None => tracing::error!("--scene requires a file path"),
                },
                "--script" => match args.next() {
                    Some(path) => opts.script = Some(PathBuf::from(path)),
                    None => tracing::error!("--script requires a file path"),
                },
                "--event-log" => match args.next() {
                    Some(path) => opts.event_log = Some(PathBuf::from(path)),
                    None => tracing::error!("--event-log requires a file path"),
                },
                "--dt" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<f32>() {
                            Ok(value) if value.is_finite() && value > 0.0 => opts.dt = Some(value),
                            Ok(value) => {
                                tracing::error!(value, "--dt must be a positive number of seconds")
                            }
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--dt must be a number");
                            }
                        }
                    } else {
                        tracing::error!("--dt requires a number of seconds");
                    }
                }
                "--max-ticks" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.max_ticks = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--max-ticks must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--max-ticks requires an integer");
                    }
                }
                other => tracing::warn!(arg = other, "ignoring unknown argument"),
            }
        }

        opts
    }
}
