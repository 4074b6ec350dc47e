use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::{debug, info};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::neat_parameters::NeatParameters;
use crate::error::Result;
use crate::evolution::genome::Genome;
use crate::evolution::innovation::InnovationDatabase;
use crate::evolution::selection::{select, SelectionStrategy};
use crate::evolution::species::Species;

fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}

/// A speciated generation of genomes plus everything needed to breed the next one.
#[derive(Serialize, Deserialize)]
pub struct Population {
    params: NeatParameters,
    genomes: Vec<Genome>,
    species: Vec<Species>,
    innovations: InnovationDatabase,
    generation: usize,
    compat_threshold: f64,
    next_genome_id: u64,
    next_species_id: u64,
    #[serde(skip, default = "entropy_rng")]
    rng: StdRng,
}

impl Population {
    /// Fill a population with copies of `seed`, optionally with weights drawn uniformly
    /// from `±random_range`.
    pub fn new(
        seed: &Genome,
        params: NeatParameters,
        randomize_weights: bool,
        random_range: f64,
        rng_seed: u64,
    ) -> Population {
        debug!(
            "Generating initial population - population_size: {}, inputs: {}, outputs: {}",
            params.population_size, seed.input_count, seed.output_count
        );

        let mut rng = StdRng::seed_from_u64(rng_seed);
        let genomes: Vec<Genome> = (0..params.population_size)
            .map(|i| {
                let mut genome = seed.clone();
                genome.id = i as u64;
                genome.set_fitness(0.0);
                if randomize_weights {
                    genome.randomize_weights(random_range, &mut rng);
                }
                genome
            })
            .collect();

        let mut population = Population {
            compat_threshold: params.compat_threshold,
            next_genome_id: genomes.len() as u64,
            params,
            genomes,
            species: Vec::new(),
            innovations: InnovationDatabase::from_genome(seed),
            generation: 0,
            next_species_id: 0,
            rng,
        };
        population.speciate();

        population
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn compat_threshold(&self) -> f64 {
        self.compat_threshold
    }

    /// Assign fitnesses in genome order. Extra values are ignored.
    pub fn set_fitnesses(&mut self, fitnesses: &[f64]) {
        for (genome, fitness) in self.genomes.iter_mut().zip(fitnesses) {
            genome.set_fitness(*fitness);
        }
    }

    pub fn best_genome(&self) -> Option<&Genome> {
        self.genomes
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    }

    /// Breed the next generation from the current, already evaluated, one.
    pub fn epoch(&mut self) {
        let population_size = self.params.population_size;

        for species in self.species.iter_mut() {
            let generation_best = species
                .members
                .iter()
                .map(|&m| self.genomes[m].fitness())
                .fold(f64::MIN, f64::max);
            species.update_stagnation(generation_best);
        }

        let best_species_id = self.best_genome().and_then(|g| g.species_id);

        if self.species.len() > 1 {
            let max_stagnation = self.params.species_max_stagnation;
            let before = self.species.len();
            self.species
                .retain(|s| s.generations_without_improvement <= max_stagnation || Some(s.id) == best_species_id);
            if self.species.len() < before {
                info!("GEN={} ::: removed {} stagnated species", self.generation, before - self.species.len());
            }
        }

        self.adjust_fitness();

        let shares: Vec<f64> = self
            .species
            .iter()
            .map(|s| s.members.iter().map(|&m| self.genomes[m].adjusted_fitness()).sum::<f64>())
            .collect();
        let mut offspring = allot_offspring(&shares, population_size);
        if let Some(best_pos) = self.species.iter().position(|s| Some(s.id) == best_species_id) {
            if offspring[best_pos] == 0 {
                if let Some(richest) = (0..offspring.len()).max_by_key(|&i| offspring[i]) {
                    offspring[richest] -= 1;
                    offspring[best_pos] += 1;
                }
            }
        }

        let next_generation = self.reproduce(&offspring);

        for species in self.species.iter_mut() {
            if let Some(&m) = species.members.choose(&mut self.rng) {
                species.representative = self.genomes[m].clone();
            }
        }

        self.genomes = next_generation;
        self.speciate();
        self.adjust_compat_threshold();
        self.generation += 1;

        debug!(
            "GEN={} ::: genomes={}, species={}, compat_threshold={:.3}, innovations={}",
            self.generation,
            self.genomes.len(),
            self.species.len(),
            self.compat_threshold,
            self.innovations.innovation_count()
        );
    }

    /// Age-adjusted fitness shared among the members of each species.
    fn adjust_fitness(&mut self) {
        let p = &self.params;
        for species in &self.species {
            let factor = species.age_factor(
                p.young_age_threshold,
                p.young_age_fitness_boost,
                p.old_age_threshold,
                p.old_age_penalty,
            );
            let size = species.members.len().max(1) as f64;
            for &m in &species.members {
                let genome = &mut self.genomes[m];
                genome.set_adjusted_fitness(genome.fitness().max(0.0) * factor / size);
            }
        }
    }

    fn reproduce(&mut self, offspring: &[usize]) -> Vec<Genome> {
        let p = &self.params;
        let strategy = SelectionStrategy::from_parameters(p.roulette_wheel_selection, p.tournament_size);
        let mut next_generation = Vec::with_capacity(p.population_size);

        for (species, &count) in self.species.iter().zip(offspring) {
            if count == 0 {
                continue;
            }

            let mut members = species.members.clone();
            members.sort_unstable_by(|&a, &b| self.genomes[b].fitness().total_cmp(&self.genomes[a].fitness()));

            let elites = ((p.elite_fraction * members.len() as f64).round() as usize)
                .max(1)
                .min(count);
            for &m in members.iter().take(elites) {
                let mut elite = self.genomes[m].clone();
                elite.id = self.next_genome_id;
                self.next_genome_id += 1;
                next_generation.push(elite);
            }

            let survivors = ((p.survival_rate * members.len() as f64).ceil() as usize)
                .clamp(1, members.len());
            let pool: Vec<&Genome> = members[..survivors].iter().map(|&m| &self.genomes[m]).collect();

            for _ in elites..count {
                let mut child = if pool.len() > 1 && self.rng.gen_bool(p.crossover_rate.clamp(0.0, 1.0)) {
                    let mother = select(&pool, strategy, &mut self.rng);
                    let mut father = select(&pool, strategy, &mut self.rng);
                    if father == mother {
                        father = (mother + 1) % pool.len();
                    }
                    let mut child = pool[mother].crossover(pool[father], &mut self.rng);
                    if self.rng.gen_bool(p.overall_mutation_rate.clamp(0.0, 1.0)) {
                        child.mutate(p, &mut self.innovations, &mut self.rng);
                    }
                    child
                } else {
                    let mut child = pool[select(&pool, strategy, &mut self.rng)].clone();
                    child.mutate(p, &mut self.innovations, &mut self.rng);
                    child
                };

                child.id = self.next_genome_id;
                self.next_genome_id += 1;
                next_generation.push(child);
            }
        }

        for genome in next_generation.iter_mut() {
            genome.set_fitness(0.0);
            genome.set_adjusted_fitness(0.0);
            genome.species_id = None;
        }

        next_generation
    }

    /// Assign every genome to the first species whose representative is close enough,
    /// founding new species as needed. Empty species are dropped.
    fn speciate(&mut self) {
        for species in self.species.iter_mut() {
            species.members.clear();
        }

        for idx in 0..self.genomes.len() {
            let genome = &self.genomes[idx];
            let found = self
                .species
                .iter()
                .position(|s| genome.compatibility_distance(&s.representative, &self.params) < self.compat_threshold);

            let species_id = match found {
                Some(pos) => {
                    self.species[pos].members.push(idx);
                    self.species[pos].id
                }
                None => {
                    let mut species = Species::new(self.next_species_id, genome.clone());
                    self.next_species_id += 1;
                    species.members.push(idx);
                    let id = species.id;
                    self.species.push(species);
                    id
                }
            };
            self.genomes[idx].species_id = Some(species_id);
        }

        self.species.retain(|s| !s.members.is_empty());
    }

    fn adjust_compat_threshold(&mut self) {
        let p = &self.params;
        if self.species.len() < p.min_species {
            self.compat_threshold = (self.compat_threshold - p.compat_threshold_modifier).max(p.min_compat_threshold);
        } else if self.species.len() > p.max_species {
            self.compat_threshold += p.compat_threshold_modifier;
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Restore a saved population; breeding continues from an RNG seeded with `rng_seed`.
    pub fn load(path: &Path, rng_seed: u64) -> Result<Population> {
        let reader = BufReader::new(File::open(path)?);
        let mut population: Population = serde_json::from_reader(reader)?;
        population.rng = StdRng::seed_from_u64(rng_seed);
        Ok(population)
    }
}

/// Split `total` offspring proportionally to `shares` using largest remainders, so the
/// counts always sum to `total`. A species without a positive share is kept alive with one
/// offspring while there are enough to go round; if no share is positive every species
/// gets an equal cut.
pub fn allot_offspring(shares: &[f64], total: usize) -> Vec<usize> {
    if shares.is_empty() {
        return Vec::new();
    }

    let positive: Vec<f64> = shares
        .iter()
        .map(|&s| if s.is_finite() && s > 0.0 { s } else { 0.0 })
        .collect();
    let sum: f64 = positive.iter().sum();
    if sum <= 0.0 {
        return largest_remainders(&vec![1.0; shares.len()], total);
    }

    let idle = positive.iter().filter(|&&s| s == 0.0).count();
    let reserved = if idle < total { idle } else { 0 };

    let mut counts = largest_remainders(&positive, total - reserved);
    if reserved > 0 {
        for (count, share) in counts.iter_mut().zip(&positive) {
            if *share == 0.0 {
                *count += 1;
            }
        }
    }

    counts
}

fn largest_remainders(weights: &[f64], total: usize) -> Vec<usize> {
    let sum: f64 = weights.iter().sum();
    let exact: Vec<f64> = weights.iter().map(|w| w / sum * total as f64).collect();

    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| (exact[b] - exact[b].floor()).total_cmp(&(exact[a] - exact[a].floor())));
    for &i in order.iter().cycle().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }

    counts
}

#[cfg(test)]
mod population_tests {
    use super::*;
    use crate::common::*;
    use crate::evolution::genes::ActivationFunction;

    fn small_params(population_size: usize) -> NeatParameters {
        NeatParameters {
            population_size,
            ..NeatParameters::default()
        }
    }

    fn seed() -> Genome {
        Genome::seed(4, 2, ActivationFunction::SignedSigmoid, 0.0)
    }

    #[test]
    fn initial_population_is_speciated() {
        setup();
        let population = Population::new(&seed(), small_params(30), true, 1.0, 0);

        assert_eq!(population.genomes().len(), 30);
        assert!(!population.species().is_empty());
        assert!(population.genomes().iter().all(|g| g.species_id.is_some()));
        let members: usize = population.species().iter().map(|s| s.members.len()).sum();
        assert_eq!(members, 30);
    }

    #[test]
    fn epoch_keeps_population_size_and_champion() {
        setup();
        let mut population = Population::new(&seed(), small_params(40), true, 1.0, 1);

        for generation in 0..5 {
            let fitnesses: Vec<f64> = population
                .genomes()
                .iter()
                .map(|g| g.links.iter().map(|l| l.weight).sum::<f64>().abs())
                .collect();
            population.set_fitnesses(&fitnesses);
            let champion = population.best_genome().unwrap().links.clone();

            population.epoch();

            assert_eq!(population.genomes().len(), 40);
            assert_eq!(population.generation(), generation + 1);
            assert!(population.genomes().iter().any(|g| g.links == champion));
        }
    }

    #[test]
    fn epoch_is_deterministic_for_a_seed() {
        setup();
        let run = || {
            let mut population = Population::new(&seed(), small_params(20), true, 1.0, 7);
            for _ in 0..3 {
                let fitnesses: Vec<f64> = population.genomes().iter().map(|g| g.links[0].weight.abs()).collect();
                population.set_fitnesses(&fitnesses);
                population.epoch();
            }
            population
                .genomes()
                .iter()
                .map(|g| g.links.iter().map(|l| l.weight).sum::<f64>())
                .collect::<Vec<f64>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn zero_fitness_population_still_reproduces() {
        setup();
        let mut population = Population::new(&seed(), small_params(15), true, 1.0, 2);
        population.set_fitnesses(&[0.0; 15]);

        population.epoch();

        assert_eq!(population.genomes().len(), 15);
    }

    #[test]
    fn save_and_load_preserve_generation() {
        setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("population.dat");
        let mut population = Population::new(&seed(), small_params(10), true, 1.0, 3);
        population.set_fitnesses(&[1.0; 10]);
        population.epoch();

        population.save(&path).unwrap();
        let loaded = Population::load(&path, 3).unwrap();

        assert_eq!(loaded.generation(), 1);
        assert_eq!(loaded.genomes().len(), 10);
        assert_eq!(loaded.species().len(), population.species().len());
    }

    #[test]
    fn allotment_sums_to_total() {
        assert_eq!(allot_offspring(&[1.0, 1.0, 1.0], 10).iter().sum::<usize>(), 10);
        assert_eq!(allot_offspring(&[0.0, 0.0], 7).iter().sum::<usize>(), 7);
        assert_eq!(allot_offspring(&[3.0, 1.0], 8), vec![6, 2]);
        assert!(allot_offspring(&[], 4).is_empty());
    }

    #[test]
    fn zero_fitness_species_still_gets_offspring() {
        assert_eq!(allot_offspring(&[5.0, 0.0], 4), vec![3, 1]);
        assert_eq!(allot_offspring(&[2.0, 0.0, 2.0, 0.0], 10), vec![4, 1, 4, 1]);
        assert_eq!(allot_offspring(&[5.0, 0.0, 0.0], 2), vec![2, 0, 0]);
    }
}
