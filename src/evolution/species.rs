use serde::{Deserialize, Serialize};

use crate::evolution::genome::Genome;

/// A cluster of genomes within the compatibility threshold of its representative.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    pub id: u64,
    pub representative: Genome,
    /// Indices into the population's genome list.
    pub members: Vec<usize>,
    pub age: usize,
    pub best_fitness: f64,
    pub generations_without_improvement: usize,
}

impl Species {
    pub fn new(id: u64, representative: Genome) -> Self {
        Species {
            id,
            representative,
            members: Vec::new(),
            age: 0,
            best_fitness: 0.0,
            generations_without_improvement: 0,
        }
    }

    pub fn is_young(&self, young_age_threshold: usize) -> bool {
        self.age < young_age_threshold
    }

    pub fn is_old(&self, old_age_threshold: usize) -> bool {
        self.age > old_age_threshold
    }

    /// Record this generation's best member fitness and age the species.
    pub fn update_stagnation(&mut self, generation_best: f64) {
        if generation_best > self.best_fitness {
            self.best_fitness = generation_best;
            self.generations_without_improvement = 0;
        } else {
            self.generations_without_improvement += 1;
        }
        self.age += 1;
    }

    /// Fitness multiplier for the species' age bracket.
    pub fn age_factor(&self, young_age_threshold: usize, boost: f64, old_age_threshold: usize, penalty: f64) -> f64 {
        if self.is_young(young_age_threshold) {
            boost
        } else if self.is_old(old_age_threshold) {
            penalty
        } else {
            1.0
        }
    }
}
