use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::evolution::genes::{ActivationFunction, NeuronKind};
use crate::evolution::genome::Genome;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct Connection {
    from: usize,
    to: usize,
    weight: f64,
}

/// Phenotype of a genome: flat neuron buffer plus the enabled connections.
///
/// Every call to `activate` advances all neurons by one synchronous step, so
/// recurrent links need no special handling and a signal crosses one layer per step.
///
/// Buffer layout follows the genome's neuron order (ascending id): inputs with the
/// bias last, then outputs, then hidden neurons.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Network {
    connections: Vec<Connection>,
    activations: Vec<ActivationFunction>,
    kinds: Vec<NeuronKind>,
    values: Vec<f64>,
    sums: Vec<f64>,
    input_indices: Vec<usize>,
    output_indices: Vec<usize>,
    slope: f64,
}

impl Network {
    pub fn from_genome(genome: &Genome, slope: f64) -> Self {
        let index: HashMap<u32, usize> = genome
            .neurons
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();

        let connections = genome
            .links
            .iter()
            .filter(|l| l.enabled)
            .filter_map(|l| {
                Some(Connection {
                    from: *index.get(&l.from)?,
                    to: *index.get(&l.to)?,
                    weight: l.weight,
                })
            })
            .collect();

        let input_indices = genome
            .neurons
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_input())
            .map(|(i, _)| i)
            .collect();
        let output_indices = genome
            .neurons
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == NeuronKind::Output)
            .map(|(i, _)| i)
            .collect();

        let neuron_count = genome.neurons.len();

        Network {
            connections,
            activations: genome.neurons.iter().map(|n| n.activation).collect(),
            kinds: genome.neurons.iter().map(|n| n.kind).collect(),
            values: vec![0.0; neuron_count],
            sums: vec![0.0; neuron_count],
            input_indices,
            output_indices,
            slope,
        }
    }

    pub fn input_count(&self) -> usize {
        self.input_indices.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_indices.len()
    }

    /// Feed `inputs` (bias value included as the last element) and advance one step.
    /// Missing inputs read as zero, extra inputs are ignored.
    pub fn activate(&mut self, inputs: &[f64]) -> Vec<f64> {
        for (slot, &neuron) in self.input_indices.iter().enumerate() {
            self.values[neuron] = inputs.get(slot).copied().unwrap_or(0.0);
        }

        self.sums.iter_mut().for_each(|s| *s = 0.0);
        for c in &self.connections {
            self.sums[c.to] += self.values[c.from] * c.weight;
        }

        for (i, kind) in self.kinds.iter().enumerate() {
            if matches!(kind, NeuronKind::Hidden | NeuronKind::Output) {
                self.values[i] = self.activations[i].apply(self.sums[i], self.slope);
            }
        }

        self.outputs()
    }

    pub fn outputs(&self) -> Vec<f64> {
        self.output_indices.iter().map(|&i| self.values[i]).collect()
    }
}
