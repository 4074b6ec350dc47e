use clap::Parser;
use log::{error, info};

use cli::{Cli, Mode};
use common::*;
use crate::config::worm_config::WormConfig;
use error::{Result, WormError};
use run::{debug_runtime, evolutionary_run, validate};
use simulation::simulation::Simulation;

mod cli;
mod common;
mod config;
mod error;
mod evolution;
mod run;
mod run_log;
mod simulation;

fn main() {
    let cli = Cli::parse();

    let config = WormConfig::load(cli.config.as_deref()).map(|mut config| {
        cli.apply(&mut config);
        config
    });

    let log_level = match &config {
        Ok(config) => config.run.log_level.clone(),
        Err(_) => "info".to_string(),
    };
    setup_with_level(&log_level);

    let result = config
        .map_err(WormError::from)
        .and_then(|config| execute(cli.mode(), &config));

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn execute(mode: Mode, config: &WormConfig) -> Result<()> {
    config.validate()?;

    match mode {
        Mode::DebugRuntime => {
            debug_runtime(config)?;
        }
        Mode::Validator => {
            let fitness = validate(config)?;
            info!("Validator run {} ::: fitness={}", config.run.val_num, fitness);
        }
        Mode::Evolution => {
            let simulation = Simulation::new(config.simulation.clone(), config.neat.activation_slope);
            let summary = evolutionary_run(config, &simulation)?;
            info!(
                "Evolutionary run {} finished ::: best_fitness={}",
                config.run.run_num,
                summary.best_fitness().unwrap_or(0.0)
            );
        }
    }

    Ok(())
}
