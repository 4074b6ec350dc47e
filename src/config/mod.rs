pub mod neat_parameters;
pub mod run_config;
pub mod simulation_config;
pub mod worm_config;
