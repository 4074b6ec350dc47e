use rand::prelude::*;

use crate::evolution::genome::Genome;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionStrategy {
    Tournament(usize),
    RouletteWheel,
}

impl SelectionStrategy {
    pub fn from_parameters(roulette_wheel: bool, tournament_size: usize) -> Self {
        if roulette_wheel {
            SelectionStrategy::RouletteWheel
        } else {
            SelectionStrategy::Tournament(tournament_size.max(1))
        }
    }
}

/// Pick one parent out of `pool` and return its position in the pool.
/// `pool` must not be empty.
pub fn select(pool: &[&Genome], selection_strategy: SelectionStrategy, rng: &mut impl Rng) -> usize {
    match selection_strategy {
        SelectionStrategy::Tournament(tournament_size) => (0..pool.len())
            .choose_multiple(rng, tournament_size.min(pool.len()))
            .into_iter()
            .max_by(|&a, &b| pool[a].fitness().total_cmp(&pool[b].fitness()))
            .unwrap_or(0),
        SelectionStrategy::RouletteWheel => {
            let total: f64 = pool.iter().map(|g| g.fitness().max(0.0)).sum();
            if total <= 0.0 {
                return rng.gen_range(0..pool.len());
            }

            let mut marble = rng.gen_range(0.0..total);
            for (i, genome) in pool.iter().enumerate() {
                marble -= genome.fitness().max(0.0);
                if marble < 0.0 {
                    return i;
                }
            }
            pool.len() - 1
        }
    }
}
