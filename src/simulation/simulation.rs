use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::simulation_config::SimulationConfig;
use crate::error::{Result, WormError};
use crate::evolution::genome::Genome;
use crate::evolution::network::Network;
use crate::run_log::read_genome;
use crate::simulation::frames::{write_frames, Frame};
use crate::simulation::worm::Worm;

/// Anything that can score a genome. Called concurrently from the worker pool.
pub trait FitnessEvaluator: Send + Sync {
    fn evaluate(&self, genome: &Genome) -> f64;
}

/// Outcome of one simulated trial.
#[derive(Debug, Clone)]
pub struct Trial {
    pub fitness: f64,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone)]
pub struct RuntimeReport {
    pub fitness: f64,
    pub wall_time: Duration,
    pub simulated_time: f64,
}

impl RuntimeReport {
    /// Simulated seconds per wall-clock second.
    pub fn real_time_factor(&self) -> f64 {
        self.simulated_time / self.wall_time.as_secs_f64().max(f64::EPSILON)
    }
}

/// Runs an ANN controller on a worm body and scores it by distance travelled.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    activation_slope: f64,
}

impl Simulation {
    pub fn new(config: SimulationConfig, activation_slope: f64) -> Self {
        Simulation { config, activation_slope }
    }

    /// Fitness of one individual. Validator runs record frames when frame logging is on.
    pub fn evaluate_individual(&self, genome: &Genome, validator: bool) -> f64 {
        self.run(genome, validator && self.config.log_frames).fitness
    }

    pub fn run(&self, genome: &Genome, record_frames: bool) -> Trial {
        let cfg = &self.config;
        let mut worm = Worm::new(cfg);
        let mut network = Network::from_genome(genome, self.activation_slope);
        let substep = cfg.dt / cfg.substeps as f64;
        let steps = cfg.control_steps();

        let mut frames = Vec::new();
        let mut inputs = Vec::with_capacity(network.input_count());

        for step in 0..steps {
            let t = step as f64 * cfg.dt;

            inputs.clear();
            inputs.extend(worm.sensors());
            if cfg.periodic {
                inputs.push((2.0 * std::f64::consts::PI * cfg.periodic_frequency * t).sin());
            }
            inputs.push(1.0);

            let outputs = network.activate(&inputs);
            for _ in 0..cfg.substeps {
                worm.step(&outputs, substep);
            }

            if record_frames {
                frames.push(Frame {
                    time: t + cfg.dt,
                    positions: worm.segment_positions(),
                });
            }
        }

        let fitness = worm.displacement();
        debug!(
            "Genome {} ({} hidden) travelled {:.4} in {} steps",
            genome.id,
            genome.hidden_count(),
            fitness,
            steps
        );

        Trial {
            fitness: if fitness.is_finite() { fitness } else { 0.0 },
            frames,
        }
    }

    /// Reject genomes whose interface does not match this worm.
    pub fn check_compatible(&self, genome: &Genome) -> Result<()> {
        genome.validate().map_err(WormError::InvalidGenome)?;

        let (inputs, outputs) = (self.config.genome_input_count(), self.config.genome_output_count());
        let network = Network::from_genome(genome, self.activation_slope);
        if network.input_count() != inputs || network.output_count() != outputs {
            return Err(WormError::InvalidGenome(format!(
                "genome has {} inputs / {} outputs, worm with {} joints needs {} / {}",
                network.input_count(),
                network.output_count(),
                self.config.num_joints,
                inputs,
                outputs
            )));
        }

        Ok(())
    }

    /// Re-evaluate a stored individual, optionally writing its frames to `frames_path`.
    pub fn validator(&self, genome_path: &Path, frames_path: Option<&Path>) -> Result<f64> {
        if !genome_path.is_file() {
            return Err(WormError::GenomeNotFound(genome_path.to_path_buf()));
        }

        let genome = read_genome(genome_path)?;
        self.check_compatible(&genome)?;

        let trial = self.run(&genome, frames_path.is_some());
        if let Some(path) = frames_path {
            write_frames(path, &trial.frames)?;
            info!("Wrote {} frames to {}", trial.frames.len(), path.display());
        }

        info!("Validated {} ::: fitness={:.6}", genome_path.display(), trial.fitness);

        Ok(trial.fitness)
    }

    /// Time a single evaluation of `genome`.
    pub fn debug_validator(&self, genome: &Genome, frames_path: Option<&Path>) -> Result<RuntimeReport> {
        let start = Instant::now();
        let trial = self.run(genome, frames_path.is_some());
        let wall_time = start.elapsed();

        if let Some(path) = frames_path {
            write_frames(path, &trial.frames)?;
        }

        let report = RuntimeReport {
            fitness: trial.fitness,
            wall_time,
            simulated_time: self.config.control_steps() as f64 * self.config.dt,
        };

        info!(
            "Simulated {:.2}s in {:?} (real time factor {:.1}), fitness={:.6}",
            report.simulated_time,
            report.wall_time,
            report.real_time_factor(),
            report.fitness
        );

        Ok(report)
    }
}

impl FitnessEvaluator for Simulation {
    fn evaluate(&self, genome: &Genome) -> f64 {
        self.evaluate_individual(genome, false)
    }
}

#[cfg(test)]
mod simulation_tests {
    use rand::prelude::*;

    use super::*;
    use crate::common::*;
    use crate::evolution::genes::ActivationFunction;
    use crate::run_log::write_best_individual;

    fn short_config() -> SimulationConfig {
        SimulationConfig {
            num_joints: 4,
            eval_time: 1.0,
            ..SimulationConfig::default()
        }
    }

    fn seed_for(config: &SimulationConfig, weight: f64) -> Genome {
        Genome::seed(
            config.genome_input_count(),
            config.genome_output_count(),
            ActivationFunction::SignedSigmoid,
            weight,
        )
    }

    #[test]
    fn silent_controller_stays_put() {
        setup();
        let config = short_config();
        let simulation = Simulation::new(config.clone(), 1.0);

        let fitness = simulation.evaluate(&seed_for(&config, 0.0));

        assert!(fitness.abs() < 1e-9);
    }

    #[test]
    fn evaluation_is_deterministic() {
        setup();
        let config = short_config();
        let simulation = Simulation::new(config.clone(), 1.0);
        let mut genome = seed_for(&config, 0.0);
        let mut rng = StdRng::seed_from_u64(4);
        genome.randomize_weights(2.0, &mut rng);

        assert_eq!(simulation.evaluate(&genome), simulation.evaluate(&genome));
    }

    #[test]
    fn frames_recorded_once_per_control_step() {
        setup();
        let config = short_config();
        let simulation = Simulation::new(config.clone(), 1.0);

        let trial = simulation.run(&seed_for(&config, 0.3), true);

        assert_eq!(trial.frames.len(), config.control_steps());
        assert_eq!(trial.frames[0].positions.len(), config.segment_count());
    }

    #[test]
    fn validator_reports_missing_file() {
        setup();
        let dir = tempfile::tempdir().unwrap();
        let simulation = Simulation::new(short_config(), 1.0);

        let result = simulation.validator(&dir.path().join("missing.dat"), None);

        assert!(matches!(result, Err(WormError::GenomeNotFound(_))));
    }

    #[test]
    fn validator_rejects_mismatched_worm() {
        setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best.dat");
        let config = short_config();
        write_best_individual(&path, &seed_for(&config, 0.1)).unwrap();

        let other = Simulation::new(SimulationConfig { num_joints: 5, ..config }, 1.0);

        assert!(matches!(other.validator(&path, None), Err(WormError::InvalidGenome(_))));
    }

    #[test]
    fn validator_writes_frames() {
        setup();
        let dir = tempfile::tempdir().unwrap();
        let genome_path = dir.path().join("best.dat");
        let frames_path = dir.path().join("frames").join("val.csv");
        let config = short_config();
        write_best_individual(&genome_path, &seed_for(&config, 0.1)).unwrap();

        let simulation = Simulation::new(config, 1.0);
        let fitness = simulation.validator(&genome_path, Some(&frames_path)).unwrap();

        assert!(fitness >= 0.0);
        assert!(frames_path.is_file());
    }

    #[test]
    fn runtime_report_covers_eval_time() {
        setup();
        let config = short_config();
        let simulation = Simulation::new(config.clone(), 1.0);

        let report = simulation.debug_validator(&seed_for(&config, 0.2), None).unwrap();

        assert!((report.simulated_time - 1.0).abs() < 1e-9);
        assert!(report.real_time_factor() > 0.0);
    }
}
