// ============================================================
// Layer 5 — VampPrior Pseudo-Inputs
// ============================================================
// A VampPrior is the mixture  p(z) = 1/N Σ_k q(z | u_k)  where
// u_1..u_N are "pseudo-inputs" living in the input space.
// They come from one of two providers:
//
//   DataPseudoInputs       the first N training examples,
//                          fixed for the whole run
//
//   GeneratedPseudoInputs  u = clamp(Linear(I_N), 0, 1)
//                          a learnable map from the one-hot
//                          trigger I_N into input space
//
// Both sit behind PseudoInputs, which the models own.
//
// Reference: Tomczak & Welling (2018) VAE with a VampPrior

use burn::{
    module::Param,
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::data::dataset::ImageSet;

// ─── PseudoInputProvider ──────────────────────────────────────────────────────
/// Shared capability of both providers: hand out N inputs shaped
/// like the model's flattened input, `[N, input_dim]`.
pub trait PseudoInputProvider<B: Backend> {
    fn pseudo_inputs(&self) -> Tensor<B, 2>;
    fn count(&self) -> usize;
}

// ─── DataPseudoInputs ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DataPseudoInputs<B: Backend> {
    /// [N, input_dim]; stored as a param so it travels with the checkpoint
    inputs: Param<Tensor<B, 2>>,
}

impl<B: Backend> DataPseudoInputs<B> {
    /// Take the first `n` rows of `train` (all of them if fewer).
    pub fn from_training_set(train: &ImageSet, n: usize, device: &B::Device) -> Self {
        let rows = n.min(train.len());
        if rows < n {
            tracing::warn!("Training set holds {} rows; using {} pseudo-inputs instead of {}", rows, rows, n);
        }
        let tensor = Tensor::<B, 2>::from_data(
            TensorData::new(train.head(rows).to_vec(), [rows, train.input_dim()]),
            device,
        );
        Self { inputs: Param::from_tensor(tensor) }
    }
}

impl<B: Backend> PseudoInputProvider<B> for DataPseudoInputs<B> {
    fn pseudo_inputs(&self) -> Tensor<B, 2> {
        // detached: no gradient ever reaches the stored examples
        self.inputs.val().detach()
    }

    fn count(&self) -> usize {
        self.inputs.val().dims()[0]
    }
}

// ─── GeneratedPseudoInputs ────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct GeneratedPseudoInputs<B: Backend> {
    generator: Linear<B>,
    count:     usize,
}

impl<B: Backend> GeneratedPseudoInputs<B> {
    pub fn new(count: usize, input_dim: usize, device: &B::Device) -> Self {
        Self {
            generator: LinearConfig::new(count, input_dim).init(device),
            count,
        }
    }
}

impl<B: Backend> PseudoInputProvider<B> for GeneratedPseudoInputs<B> {
    /// Linear(I_N) reduces to the weight matrix plus the broadcast bias.
    fn pseudo_inputs(&self) -> Tensor<B, 2> {
        // weight is stored [d_input, d_output] = [N, input_dim]
        let weight = self.generator.weight.val();
        let out = match &self.generator.bias {
            Some(bias) => weight + bias.val().unsqueeze_dim::<2>(0),
            None       => weight,
        };
        out.clamp(0.0, 1.0)
    }

    fn count(&self) -> usize {
        self.count
    }
}

// ─── PseudoInputs ─────────────────────────────────────────────────────────────
/// The provider a VampPrior model owns.
#[derive(Module, Debug)]
pub enum PseudoInputs<B: Backend> {
    Data(DataPseudoInputs<B>),
    Generated(GeneratedPseudoInputs<B>),
}

impl<B: Backend> PseudoInputs<B> {
    pub fn from_data(inner: DataPseudoInputs<B>) -> Self {
        PseudoInputs::Data(inner)
    }

    pub fn generated(inner: GeneratedPseudoInputs<B>) -> Self {
        PseudoInputs::Generated(inner)
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, PseudoInputs::Generated(_))
    }
}

impl<B: Backend> PseudoInputProvider<B> for PseudoInputs<B> {
    fn pseudo_inputs(&self) -> Tensor<B, 2> {
        match self {
            PseudoInputs::Data(d)      => d.pseudo_inputs(),
            PseudoInputs::Generated(g) => g.pseudo_inputs(),
        }
    }

    fn count(&self) -> usize {
        match self {
            PseudoInputs::Data(d)      => d.count(),
            PseudoInputs::Generated(g) => g.count(),
        }
    }
}
