use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub generations: usize,
    pub run_num: u64,
    pub output_path: PathBuf,
    /// Accepted for command-line compatibility and recorded with the run; the engine
    /// draws its mutation rates from `NeatParameters`.
    pub mutation_probability: f64,
    pub val_num: i64,
    /// Worker threads for fitness evaluation. `None` means all cores minus two.
    pub workers: Option<usize>,
    /// RNG seed. `None` means seed with `run_num`.
    pub seed: Option<u64>,
    pub log_level: String,
    /// Saved population to keep evolving instead of seeding a new one.
    pub resume: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            generations: 100,
            run_num: 0,
            output_path: PathBuf::from("./"),
            mutation_probability: 0.05,
            val_num: -1,
            workers: None,
            seed: None,
            log_level: "info".to_string(),
            resume: None,
        }
    }
}

impl RunConfig {
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(self.run_num)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.output_path.join(format!("{}_fitnesses.dat", self.run_num))
    }

    pub fn best_individuals_dir(&self) -> PathBuf {
        self.output_path.join("best_individuals")
    }

    pub fn best_individual_path(&self, generation: usize) -> PathBuf {
        self.best_individuals_dir().join(format!(
            "Evo_NEAT_run_{}_best_gen_{}.dat",
            self.run_num, generation
        ))
    }

    pub fn population_path(&self, generation: usize) -> PathBuf {
        self.output_path.join(format!(
            "run_{}_population_generation_{}.dat",
            self.run_num, generation
        ))
    }

    pub fn config_dump_path(&self) -> PathBuf {
        self.output_path.join(format!("run_{}_config.json", self.run_num))
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.output_path.join("frames")
    }

    pub fn validation_path(&self) -> PathBuf {
        self.output_path.join(format!(
            "validation_run_{}_val_{}.dat",
            self.run_num, self.val_num
        ))
    }
}
