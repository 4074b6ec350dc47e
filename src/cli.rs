use std::path::PathBuf;

use clap::Parser;

use crate::config::worm_config::WormConfig;

/// What a single invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Evolution,
    Validator,
    DebugRuntime,
}

/// Command-line options. Values given here override the layered configuration.
#[derive(Parser, Debug, Default)]
#[command(name = "worm-evo")]
#[command(about = "Evolve an ANN controller for a simulated worm robot", long_about = None)]
pub struct Cli {
    /// Validate current results.
    #[arg(long)]
    pub validator: bool,

    /// Number of generations to run evolution for (validator: generation to load).
    #[arg(long)]
    pub gens: Option<usize>,

    /// Population size for evolution.
    #[arg(long, alias = "pop_size")]
    pub pop_size: Option<usize>,

    /// Mutation probability for evolution.
    #[arg(long, alias = "mut_prob")]
    pub mut_prob: Option<f64>,

    /// Simulation time for an individual.
    #[arg(long, alias = "eval_time")]
    pub eval_time: Option<f64>,

    /// Run number.
    #[arg(long, alias = "run_num")]
    pub run_num: Option<u64>,

    /// Output path.
    #[arg(long, alias = "output_path")]
    pub output_path: Option<PathBuf>,

    /// Save the frames to a folder.
    #[arg(long, alias = "log_frames")]
    pub log_frames: bool,

    /// Number to identify the validator run.
    #[arg(long, alias = "val_num", allow_negative_numbers = true)]
    pub val_num: Option<i64>,

    /// Evaluate the run time of a simulation.
    #[arg(long, alias = "debug_runtime")]
    pub debug_runtime: bool,

    /// Leave the periodic signal out of the controller inputs.
    #[arg(long, alias = "no_periodic")]
    pub no_periodic: bool,

    /// Number of joints in the worm.
    #[arg(long, alias = "num_joints")]
    pub num_joints: Option<usize>,

    /// Simulate in the aquatic environment.
    #[arg(long)]
    pub aquatic: bool,

    /// Extra configuration file layered over config/default.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Worker threads for fitness evaluation.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Continue evolving a population saved by an earlier run.
    #[arg(long)]
    pub resume: Option<PathBuf>,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.debug_runtime {
            Mode::DebugRuntime
        } else if self.validator {
            Mode::Validator
        } else {
            Mode::Evolution
        }
    }

    pub fn apply(&self, config: &mut WormConfig) {
        if let Some(gens) = self.gens {
            config.run.generations = gens;
        }
        if let Some(pop_size) = self.pop_size {
            config.neat.population_size = pop_size;
        }
        if let Some(mut_prob) = self.mut_prob {
            config.run.mutation_probability = mut_prob;
        }
        if let Some(eval_time) = self.eval_time {
            config.simulation.eval_time = eval_time;
        }
        if let Some(run_num) = self.run_num {
            config.run.run_num = run_num;
        }
        if let Some(output_path) = &self.output_path {
            config.run.output_path = output_path.clone();
        }
        if let Some(val_num) = self.val_num {
            config.run.val_num = val_num;
        }
        if let Some(num_joints) = self.num_joints {
            config.simulation.num_joints = num_joints;
        }
        if let Some(log_level) = &self.log_level {
            config.run.log_level = log_level.clone();
        }
        if let Some(workers) = self.workers {
            config.run.workers = Some(workers);
        }
        if let Some(resume) = &self.resume {
            config.run.resume = Some(resume.clone());
        }
        if self.log_frames {
            config.simulation.log_frames = true;
        }
        if self.no_periodic {
            config.simulation.periodic = false;
        }
        if self.aquatic {
            config.simulation.aquatic = true;
        }
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn parses_underscore_option_names() {
        let cli = Cli::parse_from([
            "worm-evo",
            "--gens",
            "5",
            "--pop_size",
            "20",
            "--num-joints",
            "3",
            "--val_num",
            "-1",
            "--aquatic",
            "--no_periodic",
        ]);

        assert_eq!(cli.gens, Some(5));
        assert_eq!(cli.pop_size, Some(20));
        assert_eq!(cli.num_joints, Some(3));
        assert_eq!(cli.val_num, Some(-1));
        assert!(cli.aquatic);
        assert!(cli.no_periodic);
        assert_eq!(cli.mode(), Mode::Evolution);
    }

    #[test]
    fn debug_runtime_wins_over_validator() {
        let cli = Cli::parse_from(["worm-evo", "--validator", "--debug-runtime"]);
        assert_eq!(cli.mode(), Mode::DebugRuntime);

        let cli = Cli::parse_from(["worm-evo", "--validator"]);
        assert_eq!(cli.mode(), Mode::Validator);
    }

    #[test]
    fn only_given_options_override_config() {
        let cli = Cli::parse_from(["worm-evo", "--run-num", "4", "--aquatic"]);
        let mut config = WormConfig::default();
        config.neat.population_size = 33;

        cli.apply(&mut config);

        assert_eq!(config.run.run_num, 4);
        assert!(config.simulation.aquatic);
        assert_eq!(config.neat.population_size, 33);
        assert!(config.simulation.periodic);
    }
}
