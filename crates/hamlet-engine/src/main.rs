//! Headless engine binary for the Hamlet economy.
//!
//! Loads a game configuration, founds a demo settlement for every active
//! player, runs the lockstep frame loop and prints a JSON summary of the
//! run to stdout. Logs go to stderr.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the path given as the first argument, or
//!    `config/hamlet.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the game and found the demo settlements
//! 4. Run `game.max_frames` frames
//! 5. Save the final state and print the summary

mod error;
mod report;
mod scenario;

use std::path::{Path, PathBuf};

use hamlet_core::config::LoggingConfig;
use hamlet_core::{Game, GameConfig};
use hamlet_world::RoadGraph;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::report::RunReport;
use crate::scenario::Director;

/// Configuration used when no path is given.
const DEFAULT_CONFIG_PATH: &str = "config/hamlet.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if loading the configuration or any frame fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&path)?;
    init_tracing(&config.logging);
    if !from_file {
        warn!(path = %path.display(), "config file not found, using defaults");
    }
    let report = run(&config)?;
    println!("{}", serde_json::to_string_pretty(&report).map_err(EngineError::from)?);
    Ok(())
}

fn load_config(path: &Path) -> Result<(GameConfig, bool), EngineError> {
    if path.exists() {
        Ok((GameConfig::from_file(path)?, true))
    } else {
        Ok((GameConfig::default(), false))
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(config: &GameConfig) -> Result<RunReport, EngineError> {
    info!(
        game = %config.game.name,
        seed = config.game.seed,
        players = config.players.len(),
        max_frames = config.game.max_frames,
        "hamlet-engine starting"
    );

    let mut game = Game::new(config, RoadGraph::new())?;
    let settlements = scenario::found_settlements(&mut game)?;
    info!(
        settlements = settlements.len(),
        roads = game.paths().road_count(),
        "settlements founded"
    );

    let mut director = Director::new(settlements);
    let mut report = RunReport::new(config);
    for _ in 0..config.game.max_frames {
        director.between_frames(&mut game)?;
        let commands = director.commands(game.gf());
        let summary = game.advance_frame(commands)?;
        director.observe(&summary);
        report.record(&summary)?;
        for player in &summary.defeated {
            info!(player = %player, gf = summary.gf, "player defeated");
        }
    }

    let saved = game.save()?;
    report.finish(&game, config, saved.as_bytes().len());
    info!(frames = report.frames, gf = game.gf(), "run finished");
    Ok(report)
}
