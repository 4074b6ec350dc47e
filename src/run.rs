use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use rand::prelude::*;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::common::default_worker_count;
use crate::config::worm_config::WormConfig;
use crate::error::{Result, WormError};
use crate::evolution::genes::ActivationFunction;
use crate::evolution::genome::Genome;
use crate::evolution::population::Population;
use crate::run_log::*;
use crate::simulation::simulation::{FitnessEvaluator, RuntimeReport, Simulation};

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub best_per_generation: Vec<f64>,
}

impl RunSummary {
    pub fn best_fitness(&self) -> Option<f64> {
        self.best_per_generation.iter().copied().reduce(f64::max)
    }
}

/// Seed genome for the configured worm: every sensor, the optional periodic signal and
/// the bias wired to every joint target.
pub fn seed_genome(config: &WormConfig) -> Genome {
    Genome::seed(
        config.simulation.genome_input_count(),
        config.simulation.genome_output_count(),
        ActivationFunction::SignedSigmoid,
        0.0,
    )
}

/// Evolve controllers for `config.run.generations` generations, scoring each genome with
/// `evaluator` on a dedicated worker pool and logging every generation to disk.
pub fn evolutionary_run<E: FitnessEvaluator + ?Sized>(config: &WormConfig, evaluator: &E) -> Result<RunSummary> {
    let run = &config.run;
    let seed = seed_genome(config);

    info!(
        "Starting evolutionary run {} - generations: {}, population_size: {}, inputs: {}, outputs: {}, mutation_probability: {}",
        run.run_num,
        run.generations,
        config.neat.population_size,
        seed.input_count,
        seed.output_count,
        run.mutation_probability
    );

    let mut population = match &run.resume {
        Some(path) => resume_population(path, &seed, run.effective_seed())?,
        None => Population::new(
            &seed,
            config.neat.clone(),
            true,
            config.neat.initial_weight_range,
            run.effective_seed(),
        ),
    };

    std::fs::create_dir_all(run.best_individuals_dir())?;
    let stats_path = run.stats_path();
    if run.resume.is_none() || !stats_path.is_file() {
        write_population_statistics_headers(&stats_path)?;
    }
    write_json(&run.config_dump_path(), config)?;

    let workers = run.workers.unwrap_or_else(default_worker_count).max(1);
    let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
    debug!("Fitness evaluation pool with {} workers", workers);

    let mut summary = RunSummary::default();

    for generation in population.generation()..run.generations {
        let evaluate_start = Instant::now();

        let raw_fitnesses: Vec<f64> = pool.install(|| {
            population
                .genomes()
                .par_iter()
                .map(|genome| evaluator.evaluate(genome))
                .collect()
        });
        population.set_fitnesses(&raw_fitnesses);
        let fitnesses: Vec<f64> = population.genomes().iter().map(Genome::fitness).collect();

        let evaluate_elapsed = evaluate_start.elapsed();

        let (best_idx, best_fitness) = fitnesses
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, 0.0));
        let fitness_avg = fitnesses.iter().sum::<f64>() / fitnesses.len().max(1) as f64;

        info!("Generation {}\t: {}", generation, best_fitness);
        info!(
            "GEN={} ::: fitness_max={:.6}, fitness_average={:.6}, species={}, compat_threshold={:.3}, evaluate_elapsed={:?}",
            generation,
            best_fitness,
            fitness_avg,
            population.species().len(),
            population.compat_threshold(),
            evaluate_elapsed
        );

        if let Some(best) = population.genomes().get(best_idx) {
            write_best_individual(&run.best_individual_path(generation), best)?;
        }
        write_population_statistics(&stats_path, population.genomes(), &fitnesses, generation)?;

        summary.best_per_generation.push(best_fitness);

        if generation + 1 == run.generations {
            let path = run.population_path(generation);
            population.save(&path)?;
            info!("Saved final population to {}", path.display());
        } else {
            population.epoch();
        }
    }

    Ok(summary)
}

/// Load a population saved after its last evaluation and breed the generation that follows.
fn resume_population(path: &Path, seed: &Genome, rng_seed: u64) -> Result<Population> {
    if !path.is_file() {
        return Err(WormError::PopulationNotFound(path.to_path_buf()));
    }

    let mut population = Population::load(path, rng_seed)?;
    if let Some(genome) = population.genomes().first() {
        if genome.input_count != seed.input_count || genome.output_count != seed.output_count {
            return Err(WormError::InvalidGenome(format!(
                "saved population has {} inputs / {} outputs, this worm needs {} / {}",
                genome.input_count, genome.output_count, seed.input_count, seed.output_count
            )));
        }
    }

    population.epoch();
    info!("Resumed {} at generation {}", path.display(), population.generation());

    Ok(population)
}

/// Re-evaluate the best individual stored for generation `config.run.generations`.
pub fn validate(config: &WormConfig) -> Result<f64> {
    let run = &config.run;
    let simulation = Simulation::new(config.simulation.clone(), config.neat.activation_slope);
    let genome_path = run.best_individual_path(run.generations);

    let frames_path = config.simulation.log_frames.then(|| {
        run.frames_dir()
            .join(format!("run_{}_val_{}.csv", run.run_num, run.val_num))
    });

    let fitness = simulation.validator(&genome_path, frames_path.as_deref())?;
    write_validation_result(&run.validation_path(), &genome_path, fitness)?;

    Ok(fitness)
}

/// Time one simulation of a randomly weighted seed genome.
pub fn debug_runtime(config: &WormConfig) -> Result<RuntimeReport> {
    let run = &config.run;
    let simulation = Simulation::new(config.simulation.clone(), config.neat.activation_slope);

    let mut genome = seed_genome(config);
    let mut rng = StdRng::seed_from_u64(run.effective_seed());
    genome.randomize_weights(config.neat.initial_weight_range, &mut rng);

    let frames_path = config
        .simulation
        .log_frames
        .then(|| run.frames_dir().join(format!("run_{}_debug.csv", run.run_num)));

    simulation.debug_validator(&genome, frames_path.as_deref())
}
