use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronKind {
    Input,
    /// Constant-one input; always the last input neuron.
    Bias,
    Hidden,
    Output,
}

/// Transfer function applied to the weighted input sum of hidden and output neurons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationFunction {
    /// Sigmoid rescaled to (-1, 1).
    SignedSigmoid,
    UnsignedSigmoid,
    Tanh,
    Linear,
}

impl ActivationFunction {
    pub fn apply(&self, x: f64, slope: f64) -> f64 {
        match self {
            ActivationFunction::SignedSigmoid => (1.0 / (1.0 + (-slope * x).exp()) - 0.5) * 2.0,
            ActivationFunction::UnsignedSigmoid => 1.0 / (1.0 + (-slope * x).exp()),
            ActivationFunction::Tanh => (slope * x).tanh(),
            ActivationFunction::Linear => x,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuronGene {
    pub id: u32,
    pub kind: NeuronKind,
    pub activation: ActivationFunction,
}

impl NeuronGene {
    pub fn new(id: u32, kind: NeuronKind, activation: ActivationFunction) -> Self {
        NeuronGene { id, kind, activation }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, NeuronKind::Input | NeuronKind::Bias)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkGene {
    pub innovation: u32,
    pub from: u32,
    pub to: u32,
    pub weight: f64,
    pub enabled: bool,
    /// Link closes a cycle in the neuron graph.
    pub recurrent: bool,
}

impl LinkGene {
    pub fn new(innovation: u32, from: u32, to: u32, weight: f64, recurrent: bool) -> Self {
        LinkGene {
            innovation,
            from,
            to,
            weight,
            enabled: true,
            recurrent,
        }
    }
}

#[cfg(test)]
mod genes_tests {
    use super::*;

    #[test]
    fn signed_sigmoid_is_symmetric_and_bounded() {
        let f = ActivationFunction::SignedSigmoid;

        assert!(f.apply(0.0, 1.0).abs() < 1e-12);
        assert!((f.apply(2.0, 1.0) + f.apply(-2.0, 1.0)).abs() < 1e-12);
        assert!(f.apply(100.0, 1.0) <= 1.0);
        assert!(f.apply(-100.0, 1.0) >= -1.0);
    }

    #[test]
    fn unsigned_sigmoid_midpoint() {
        assert!((ActivationFunction::UnsignedSigmoid.apply(0.0, 4.9) - 0.5).abs() < 1e-12);
    }
}
