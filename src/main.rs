mod config;
mod module;
mod predict;
mod sat;
mod sink;
mod station;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info, warn};

use crate::config::{Config, DynState};
use crate::module::registry::TleDirSource;
use crate::module::{Module, ModuleCore};
use crate::predict::Sgp4Engine;
use crate::sink::ViewKind;
use crate::station::GroundStation;

#[derive(Parser)]
#[command(name = "satwatch")]
#[command(about = "Headless satellite tracking and event prediction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a module configuration file
    Validate { config: String },
    /// Run a tracking module
    Run { config: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run { config } => run(&config).await,
    }
}

fn validate(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let layout = config.validated_layout();
    println!("Module '{}' is valid", config.module.name);
    println!(
        "  station: {} @ {}",
        config.station.name.as_deref().unwrap_or("unnamed"),
        config.station.coordinates
    );
    println!("  satellites: {}", config.satellites.len());
    println!(
        "  tick period: {}",
        humantime::format_duration(config.module.timeout)
    );
    println!(
        "  lookahead: {}",
        humantime::format_duration(config.predict.lookahead)
    );
    for (i, group) in layout.chunks_exact(5).enumerate() {
        println!(
            "  view {}: {:?} at ({},{})..({},{})",
            i + 1,
            ViewKind::from_code(group[0]),
            group[1],
            group[3],
            group[2],
            group[4]
        );
    }

    ExitCode::SUCCESS
}

async fn run(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let state_path = config
        .module
        .state_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{path}.state")));
    let persisted = config::load_state(&state_path);

    // persisted key list wins over the configured one
    let keys = persisted
        .as_ref()
        .map(|s| s.satellites.clone())
        .unwrap_or_else(|| config.satellites.clone());
    let display_state = persisted.map(|s| s.state).unwrap_or_default();

    let station = GroundStation::from_coordinates(
        &config.station.coordinates,
        Some(config.station.altitude_m),
    )
    .unwrap_or_else(|| {
        warn!(
            "invalid station coordinates '{}', using defaults",
            config.station.coordinates
        );
        GroundStation::default()
    });

    let source = match TleDirSource::open(&config.predict.tle_folder) {
        Ok(s) => {
            info!("TLE source holds {} satellites", s.len());
            s
        }
        Err(e) => {
            error!("cannot open TLE source: {e}");
            return ExitCode::FAILURE;
        }
    };

    let views = sink::build_sinks(&config.validated_layout(), config.telemetry.as_ref());

    let mut core = ModuleCore::new(
        config.module.name.clone(),
        station,
        config.module.timeout,
        config.module.throttle,
        config.predict.horizon_days(),
        config.module.time_format.clone(),
        keys,
        Box::new(source),
        Box::new(Sgp4Engine),
        views,
    );
    core.load_sats();

    let mut module = Module::new(core, config.module.timeout);
    module.start();
    info!(
        "module {} started (state {:?})",
        config.module.name, display_state
    );

    wait_for_shutdown(&module).await;

    module.stop().await;

    let keys = {
        let core = module.core().lock().unwrap_or_else(|p| p.into_inner());
        core.registry.keys().to_vec()
    };
    let state = DynState {
        state: display_state,
        satellites: keys,
    };
    if let Err(e) = config::save_state(&state_path, &state) {
        warn!("could not persist module state: {e}");
    }

    info!("module {} closed", config.module.name);
    ExitCode::SUCCESS
}

/// Block until Ctrl-C; SIGHUP triggers a satellite reload in the meantime.
#[cfg(unix)]
async fn wait_for_shutdown(module: &Module) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGHUP handler: {e}");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to wait for shutdown signal: {e}");
            }
            return;
        }
    };

    loop {
        tokio::select! {
            r = tokio::signal::ctrl_c() => {
                if let Err(e) = r {
                    error!("failed to wait for shutdown signal: {e}");
                }
                return;
            }
            _ = hangup.recv() => {
                let summary = module.reload_sats();
                info!(
                    "reload complete: {} of {} satellites",
                    summary.loaded, summary.requested
                );
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_module: &Module) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to wait for shutdown signal: {e}");
    }
}
