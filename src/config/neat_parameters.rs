use serde::{Deserialize, Serialize};

/// Hyperparameters of the neuroevolution engine.
///
/// Defaults are the values the worm experiments were tuned with; the remaining
/// knobs use the engine's customary values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeatParameters {
    pub population_size: usize,

    // Speciation
    pub compat_threshold: f64,
    pub compat_threshold_modifier: f64,
    pub min_compat_threshold: f64,
    pub min_species: usize,
    pub max_species: usize,
    pub excess_coeff: f64,
    pub disjoint_coeff: f64,
    pub weight_diff_coeff: f64,

    // Species ageing
    pub young_age_threshold: usize,
    pub young_age_fitness_boost: f64,
    pub old_age_threshold: usize,
    pub old_age_penalty: f64,
    pub species_max_stagnation: usize,

    // Reproduction
    pub roulette_wheel_selection: bool,
    pub tournament_size: usize,
    pub survival_rate: f64,
    pub elite_fraction: f64,
    pub crossover_rate: f64,
    pub overall_mutation_rate: f64,

    // Structural mutation
    pub recurrent_prob: f64,
    pub mutate_add_neuron_prob: f64,
    pub mutate_add_link_prob: f64,
    pub mutate_rem_link_prob: f64,
    pub max_link_attempts: usize,

    // Weight mutation
    pub mutate_weights_prob: f64,
    pub mutate_weights_severe_prob: f64,
    pub weight_mutation_rate: f64,
    pub weight_mutation_max_power: f64,
    pub weight_replacement_max_power: f64,
    pub max_weight: f64,

    // Phenotype
    pub initial_weight_range: f64,
    pub activation_slope: f64,
}

impl Default for NeatParameters {
    fn default() -> Self {
        NeatParameters {
            population_size: 100,

            compat_threshold: 5.0,
            compat_threshold_modifier: 0.3,
            min_compat_threshold: 0.2,
            min_species: 1,
            max_species: 25,
            excess_coeff: 1.0,
            disjoint_coeff: 1.0,
            weight_diff_coeff: 0.5,

            young_age_threshold: 15,
            young_age_fitness_boost: 1.1,
            old_age_threshold: 35,
            old_age_penalty: 0.5,
            species_max_stagnation: 1000,

            roulette_wheel_selection: false,
            tournament_size: 4,
            survival_rate: 0.25,
            elite_fraction: 0.01,
            crossover_rate: 0.7,
            overall_mutation_rate: 0.33,

            recurrent_prob: 0.25,
            mutate_add_neuron_prob: 0.4,
            mutate_add_link_prob: 0.4,
            mutate_rem_link_prob: 0.05,
            max_link_attempts: 32,

            mutate_weights_prob: 0.90,
            mutate_weights_severe_prob: 0.5,
            weight_mutation_rate: 0.75,
            weight_mutation_max_power: 1.0,
            weight_replacement_max_power: 5.0,
            max_weight: 20.0,

            initial_weight_range: 1.0,
            activation_slope: 1.0,
        }
    }
}
