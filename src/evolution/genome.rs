use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

use log::trace;
use rand::distributions::{Uniform, WeightedIndex};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::neat_parameters::NeatParameters;
use crate::evolution::genes::{ActivationFunction, LinkGene, NeuronGene, NeuronKind};
use crate::evolution::innovation::InnovationDatabase;

/// Direct encoding of a controller network: neuron and link genes, links ordered by
/// innovation number.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genome {
    pub id: u64,
    pub neurons: Vec<NeuronGene>,
    pub links: Vec<LinkGene>,
    pub input_count: usize,
    pub output_count: usize,
    pub species_id: Option<u64>,
    fitness: f64,
    #[serde(skip)]
    adjusted_fitness: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mutation {
    AddNeuron,
    AddLink,
    RemoveLink,
    Weights,
}

impl Genome {
    /// A genome with every input wired to every output and no hidden neurons.
    /// `input_count` includes the bias, which is the last input.
    pub fn seed(
        input_count: usize,
        output_count: usize,
        output_activation: ActivationFunction,
        initial_weight: f64,
    ) -> Genome {
        let mut neurons = Vec::with_capacity(input_count + output_count);
        for i in 0..input_count {
            let kind = if i + 1 == input_count { NeuronKind::Bias } else { NeuronKind::Input };
            neurons.push(NeuronGene::new(i as u32, kind, ActivationFunction::Linear));
        }
        for o in 0..output_count {
            neurons.push(NeuronGene::new((input_count + o) as u32, NeuronKind::Output, output_activation));
        }

        let mut links = Vec::with_capacity(input_count * output_count);
        for i in 0..input_count {
            for o in 0..output_count {
                let innovation = (i * output_count + o) as u32;
                links.push(LinkGene::new(innovation, i as u32, (input_count + o) as u32, initial_weight, false));
            }
        }

        Genome {
            id: 0,
            neurons,
            links,
            input_count,
            output_count,
            species_id: None,
            fitness: 0.0,
            adjusted_fitness: 0.0,
        }
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = if fitness.is_finite() { fitness } else { 0.0 };
    }

    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    pub fn set_adjusted_fitness(&mut self, fitness: f64) {
        self.adjusted_fitness = fitness;
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.iter().filter(|l| l.enabled).count()
    }

    pub fn hidden_count(&self) -> usize {
        self.neurons.iter().filter(|n| n.kind == NeuronKind::Hidden).count()
    }

    pub fn has_neuron(&self, id: u32) -> bool {
        self.neurons.iter().any(|n| n.id == id)
    }

    fn neuron(&self, id: u32) -> Option<&NeuronGene> {
        self.neurons.iter().find(|n| n.id == id)
    }

    pub fn randomize_weights(&mut self, range: f64, rng: &mut impl Rng) {
        let uniform = Uniform::new_inclusive(-range, range);
        for link in self.links.iter_mut() {
            link.weight = rng.sample(uniform);
        }
    }

    /// Check the structural invariants a loaded genome must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        let inputs = self.neurons.iter().filter(|n| n.is_input()).count();
        let outputs = self.neurons.iter().filter(|n| n.kind == NeuronKind::Output).count();
        if inputs != self.input_count || outputs != self.output_count {
            return Err(format!(
                "expected {} inputs and {} outputs, found {} and {}",
                self.input_count, self.output_count, inputs, outputs
            ));
        }

        let ids: HashSet<u32> = self.neurons.iter().map(|n| n.id).collect();
        if let Some(link) = self.links.iter().find(|l| !ids.contains(&l.from) || !ids.contains(&l.to)) {
            return Err(format!("link {} references a missing neuron", link.innovation));
        }

        Ok(())
    }

    /// Apply one structural or weight mutation chosen by the configured probabilities.
    pub fn mutate(&mut self, params: &NeatParameters, innovations: &mut InnovationDatabase, rng: &mut impl Rng) {
        let choices = [
            (Mutation::AddNeuron, params.mutate_add_neuron_prob),
            (Mutation::AddLink, params.mutate_add_link_prob),
            (Mutation::RemoveLink, params.mutate_rem_link_prob),
            (Mutation::Weights, params.mutate_weights_prob),
        ];

        let mutation = match WeightedIndex::new(choices.iter().map(|c| c.1.max(0.0))) {
            Ok(dist) => choices[dist.sample(rng)].0,
            Err(_) => Mutation::Weights,
        };

        let applied = match mutation {
            Mutation::AddNeuron => self.mutate_add_neuron(innovations, rng),
            Mutation::AddLink => self.mutate_add_link(params, innovations, rng),
            Mutation::RemoveLink => self.mutate_remove_link(rng),
            Mutation::Weights => {
                self.mutate_weights(params, rng);
                true
            }
        };

        if !applied {
            self.mutate_weights(params, rng);
        }

        trace!("Genome {} mutation {:?} applied: {}", self.id, mutation, applied);
    }

    pub fn mutate_weights(&mut self, params: &NeatParameters, rng: &mut impl Rng) {
        let severe = rng.gen_bool(params.mutate_weights_severe_prob.clamp(0.0, 1.0));
        let perturb = Uniform::new_inclusive(-params.weight_mutation_max_power, params.weight_mutation_max_power);
        let replace = Uniform::new_inclusive(-params.weight_replacement_max_power, params.weight_replacement_max_power);
        let rate = params.weight_mutation_rate.clamp(0.0, 1.0);

        for link in self.links.iter_mut() {
            if !rng.gen_bool(rate) {
                continue;
            }
            link.weight = if severe {
                rng.sample(replace)
            } else {
                link.weight + rng.sample(perturb)
            };
            link.weight = link.weight.clamp(-params.max_weight, params.max_weight);
        }
    }

    pub fn mutate_add_neuron(&mut self, innovations: &mut InnovationDatabase, rng: &mut impl Rng) -> bool {
        let candidates: Vec<usize> = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, l)| l.enabled)
            .map(|(i, _)| i)
            .collect();

        let Some(&link_idx) = candidates.choose(rng) else {
            return false;
        };

        self.links[link_idx].enabled = false;
        let old = self.links[link_idx].clone();
        let split = innovations.split(old.innovation, old.from, old.to, |id| self.has_neuron(id));

        let activation = self
            .neurons
            .iter()
            .find(|n| n.kind == NeuronKind::Output)
            .map(|n| n.activation)
            .unwrap_or(ActivationFunction::SignedSigmoid);

        self.neurons.push(NeuronGene::new(split.neuron_id, NeuronKind::Hidden, activation));
        self.neurons.sort_unstable_by_key(|n| n.id);

        self.insert_link(LinkGene::new(split.in_innovation, old.from, split.neuron_id, 1.0, false));
        self.insert_link(LinkGene::new(split.out_innovation, split.neuron_id, old.to, old.weight, old.recurrent));

        true
    }

    pub fn mutate_add_link(&mut self, params: &NeatParameters, innovations: &mut InnovationDatabase, rng: &mut impl Rng) -> bool {
        let allow_recurrent = rng.gen_bool(params.recurrent_prob.clamp(0.0, 1.0));
        let sources: Vec<u32> = self.neurons.iter().map(|n| n.id).collect();
        let targets: Vec<u32> = self.neurons.iter().filter(|n| !n.is_input()).map(|n| n.id).collect();

        if sources.is_empty() || targets.is_empty() {
            return false;
        }

        for _ in 0..params.max_link_attempts {
            let from = sources[rng.gen_range(0..sources.len())];
            let to = targets[rng.gen_range(0..targets.len())];

            if let Some(existing) = self.links.iter_mut().find(|l| l.from == from && l.to == to) {
                if existing.enabled {
                    continue;
                }
                existing.enabled = true;
                return true;
            }

            let recurrent = from == to || self.path_exists(to, from);
            if recurrent && !allow_recurrent {
                continue;
            }

            let weight = rng.gen_range(-params.initial_weight_range..=params.initial_weight_range);
            let innovation = innovations.link_innovation(from, to);
            self.insert_link(LinkGene::new(innovation, from, to, weight, recurrent));
            return true;
        }

        false
    }

    pub fn mutate_remove_link(&mut self, rng: &mut impl Rng) -> bool {
        if self.links.len() <= 1 {
            return false;
        }

        let idx = rng.gen_range(0..self.links.len());
        self.links.remove(idx);
        self.prune_orphan_neurons();

        true
    }

    /// Remove hidden neurons that no link touches any more.
    fn prune_orphan_neurons(&mut self) {
        let used: HashSet<u32> = self.links.iter().flat_map(|l| [l.from, l.to]).collect();
        self.neurons.retain(|n| n.kind != NeuronKind::Hidden || used.contains(&n.id));
    }

    fn insert_link(&mut self, link: LinkGene) {
        let pos = self.links.partition_point(|l| l.innovation < link.innovation);
        self.links.insert(pos, link);
    }

    /// Whether `to` is reachable from `from` following link direction.
    fn path_exists(&self, from: u32, to: u32) -> bool {
        let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
        for link in &self.links {
            adjacency.entry(link.from).or_default().push(link.to);
        }

        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if visited.insert(node) {
                if let Some(next) = adjacency.get(&node) {
                    stack.extend(next.iter().copied());
                }
            }
        }

        false
    }

    /// Combine two parents aligned by innovation number. Matching genes come from a random
    /// parent, disjoint and excess genes from the fitter one.
    pub fn crossover(&self, other: &Genome, rng: &mut impl Rng) -> Genome {
        let (fitter, weaker) = if self.fitness > other.fitness
            || (self.fitness == other.fitness && self.links.len() <= other.links.len())
        {
            (self, other)
        } else {
            (other, self)
        };

        let weaker_links: HashMap<u32, &LinkGene> = weaker.links.iter().map(|l| (l.innovation, l)).collect();

        let mut links = Vec::with_capacity(fitter.links.len());
        for link in &fitter.links {
            let mut child_link = match weaker_links.get(&link.innovation) {
                Some(matching) if rng.gen_bool(0.5) => (*matching).clone(),
                _ => link.clone(),
            };
            if let Some(matching) = weaker_links.get(&link.innovation) {
                if !link.enabled || !matching.enabled {
                    child_link.enabled = !rng.gen_bool(0.75);
                }
            }
            links.push(child_link);
        }

        let used: HashSet<u32> = links.iter().flat_map(|l| [l.from, l.to]).collect();
        let mut neurons: Vec<NeuronGene> = fitter
            .neurons
            .iter()
            .filter(|n| n.kind != NeuronKind::Hidden || used.contains(&n.id))
            .cloned()
            .collect();
        for id in used {
            if !neurons.iter().any(|n| n.id == id) {
                if let Some(neuron) = weaker.neuron(id) {
                    neurons.push(neuron.clone());
                }
            }
        }
        neurons.sort_unstable_by_key(|n| n.id);

        Genome {
            id: 0,
            neurons,
            links,
            input_count: fitter.input_count,
            output_count: fitter.output_count,
            species_id: None,
            fitness: 0.0,
            adjusted_fitness: 0.0,
        }
    }

    /// Genetic distance used for speciation.
    pub fn compatibility_distance(&self, other: &Genome, params: &NeatParameters) -> f64 {
        let (mut i, mut j) = (0, 0);
        let (mut matching, mut disjoint, mut excess) = (0usize, 0usize, 0usize);
        let mut weight_diff = 0.0;

        let a = &self.links;
        let b = &other.links;

        while i < a.len() && j < b.len() {
            match a[i].innovation.cmp(&b[j].innovation) {
                std::cmp::Ordering::Equal => {
                    matching += 1;
                    weight_diff += (a[i].weight - b[j].weight).abs();
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => {
                    disjoint += 1;
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    disjoint += 1;
                    j += 1;
                }
            }
        }
        excess += (a.len() - i) + (b.len() - j);

        let longest = a.len().max(b.len());
        let normalizer = if longest < 20 { 1.0 } else { longest as f64 };
        let mean_weight_diff = if matching > 0 { weight_diff / matching as f64 } else { 0.0 };

        params.excess_coeff * excess as f64 / normalizer
            + params.disjoint_coeff * disjoint as f64 / normalizer
            + params.weight_diff_coeff * mean_weight_diff
    }
}

impl Display for Genome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Genome(id={}, neurons={}, links={}, fitness={:.4})",
            self.id,
            self.neurons.len(),
            self.link_count(),
            self.fitness
        )
    }
}

#[cfg(test)]
mod genome_tests {
    use rand::rngs::StdRng;

    use super::*;
    use crate::common::*;

    fn seeded() -> (Genome, InnovationDatabase, StdRng) {
        let genome = Genome::seed(3, 2, ActivationFunction::SignedSigmoid, 0.0);
        let db = InnovationDatabase::from_genome(&genome);
        (genome, db, StdRng::seed_from_u64(42))
    }

    #[test]
    fn seed_is_fully_connected() {
        setup();
        let (genome, _, _) = seeded();

        assert_eq!(genome.neuron_count(), 5);
        assert_eq!(genome.link_count(), 6);
        assert_eq!(genome.neurons[2].kind, NeuronKind::Bias);
        assert!(genome.validate().is_ok());
    }

    #[test]
    fn add_neuron_splits_link() {
        setup();
        let (mut genome, mut db, mut rng) = seeded();

        assert!(genome.mutate_add_neuron(&mut db, &mut rng));

        assert_eq!(genome.hidden_count(), 1);
        assert_eq!(genome.links.len(), 8);
        assert_eq!(genome.link_count(), 7);
        assert!(genome.links.windows(2).all(|w| w[0].innovation < w[1].innovation));
        assert!(genome.validate().is_ok());
    }

    #[test]
    fn add_link_respects_existing_links() {
        setup();
        let (mut genome, mut db, mut rng) = seeded();
        let params = NeatParameters {
            recurrent_prob: 0.0,
            ..NeatParameters::default()
        };

        genome.mutate_add_neuron(&mut db, &mut rng);
        let before = genome.links.len();
        let mut added = false;
        for _ in 0..20 {
            added |= genome.mutate_add_link(&params, &mut db, &mut rng);
        }
        assert!(added);
        assert!(genome.links.len() > before);
        assert!(genome.links.iter().all(|l| !l.recurrent));
    }

    #[test]
    fn weights_stay_within_bounds() {
        setup();
        let (mut genome, _, mut rng) = seeded();
        let params = NeatParameters {
            max_weight: 2.0,
            weight_replacement_max_power: 10.0,
            weight_mutation_rate: 1.0,
            ..NeatParameters::default()
        };

        for _ in 0..50 {
            genome.mutate_weights(&params, &mut rng);
        }

        assert!(genome.links.iter().all(|l| l.weight.abs() <= 2.0));
    }

    #[test]
    fn remove_link_prunes_orphans() {
        setup();
        let mut genome = Genome::seed(1, 1, ActivationFunction::SignedSigmoid, 0.5);
        let mut db = InnovationDatabase::from_genome(&genome);
        let mut rng = StdRng::seed_from_u64(1);
        genome.mutate_add_neuron(&mut db, &mut rng);

        while genome.links.len() > 1 {
            genome.mutate_remove_link(&mut rng);
        }

        assert!(!genome.mutate_remove_link(&mut rng));
        let hidden_used = genome
            .neurons
            .iter()
            .filter(|n| n.kind == NeuronKind::Hidden)
            .all(|n| genome.links.iter().any(|l| l.from == n.id || l.to == n.id));
        assert!(hidden_used);
    }

    #[test]
    fn crossover_keeps_fitter_structure() {
        setup();
        let (mut fit, mut db, mut rng) = seeded();
        let mut weak = fit.clone();
        fit.mutate_add_neuron(&mut db, &mut rng);
        fit.set_fitness(10.0);
        weak.set_fitness(1.0);

        let child = weak.crossover(&fit, &mut rng);

        assert_eq!(child.links.len(), fit.links.len());
        assert_eq!(child.hidden_count(), 1);
        assert!(child.validate().is_ok());
    }

    #[test]
    fn distance_is_zero_for_identical_and_grows_with_structure() {
        setup();
        let (genome, mut db, mut rng) = seeded();
        let params = NeatParameters::default();
        let mut other = genome.clone();

        assert_eq!(genome.compatibility_distance(&other, &params), 0.0);

        other.mutate_add_neuron(&mut db, &mut rng);
        assert!(genome.compatibility_distance(&other, &params) >= 2.0);
    }

    #[test]
    fn non_finite_fitness_is_zeroed() {
        let (mut genome, _, _) = seeded();
        genome.set_fitness(f64::NAN);
        assert_eq!(genome.fitness(), 0.0);
    }
}
