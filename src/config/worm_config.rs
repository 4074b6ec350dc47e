use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::neat_parameters::NeatParameters;
use crate::config::run_config::RunConfig;
use crate::config::simulation_config::SimulationConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WormConfig {
    pub run: RunConfig,
    pub neat: NeatParameters,
    pub simulation: SimulationConfig,
}

impl WormConfig {
    /// Layer `config/default`, an optional user file and `WORM_*` environment variables
    /// over the built-in defaults.
    pub fn load(user_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false));

        if let Some(path) = user_file {
            builder = builder.add_source(File::from(path));
        }

        let s = builder
            .add_source(
                Environment::with_prefix("worm")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        debug!("Using config sources: {:?}", s);

        let deserialized: WormConfig = s.try_deserialize()?;

        Ok(deserialized)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Message(msg.to_string()));

        if self.neat.population_size == 0 {
            return fail("Population size must be greater than 0");
        }
        if self.simulation.num_joints == 0 {
            return fail("The worm needs at least one joint");
        }
        if !(self.simulation.eval_time > 0.0) || !(self.simulation.dt > 0.0) {
            return fail("eval_time and dt must be positive");
        }
        if self.simulation.substeps == 0 {
            return fail("substeps must be at least 1");
        }
        if self.neat.min_species == 0 || self.neat.min_species > self.neat.max_species {
            return fail("min_species must be in 1..=max_species");
        }
        if self.neat.tournament_size == 0 {
            return fail("tournament_size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.neat.survival_rate) || self.neat.survival_rate == 0.0 {
            return fail("survival_rate must be in (0, 1]");
        }

        let weight_bounds = [
            ("initial_weight_range", self.neat.initial_weight_range),
            ("weight_mutation_max_power", self.neat.weight_mutation_max_power),
            ("weight_replacement_max_power", self.neat.weight_replacement_max_power),
            ("max_weight", self.neat.max_weight),
        ];
        for (name, value) in weight_bounds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Message(format!("{} must be a non-negative number, got {}", name, value)));
            }
        }

        info!(
            "Config OK - population_size: {}, generations: {}, num_joints: {}, aquatic: {}",
            self.neat.population_size,
            self.run.generations,
            self.simulation.num_joints,
            self.simulation.aquatic
        );

        Ok(())
    }
}
