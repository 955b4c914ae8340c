use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::distributions::{
    log_bernoulli_logits, log_mixture_normal, log_normal_diag, log_standard_normal,
    reparameterize, LOGVAR_MAX, LOGVAR_MIN,
};
use crate::ml::hvae::Hvae;
use crate::ml::pseudo_inputs::{PseudoInputProvider, PseudoInputs};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct VaeConfig {
    /// Flattened example width, prod(dims)
    pub input_dim:  usize,
    #[config(default = 300)]
    pub hidden_dim: usize,
    /// Width of every stochastic layer
    #[config(default = 40)]
    pub latent_dim: usize,
}

impl VaeConfig {
    /// `prior == None` means a standard Gaussian prior.
    pub fn init_vanilla<B: Backend>(
        &self,
        prior:  Option<PseudoInputs<B>>,
        device: &B::Device,
    ) -> VanillaVae<B> {
        VanillaVae {
            encoder: GaussianHead::new(self.input_dim, self.hidden_dim, self.latent_dim, device),
            decoder: BernoulliDecoder::new(self.latent_dim, self.hidden_dim, self.input_dim, device),
            prior,
            input_dim: self.input_dim,
        }
    }
}

// ─── Building blocks ──────────────────────────────────────────────────────────

/// Two ReLU layers followed by mean and log-variance projections.
#[derive(Module, Debug)]
pub struct GaussianHead<B: Backend> {
    hidden1: Linear<B>,
    hidden2: Linear<B>,
    mean:    Linear<B>,
    logvar:  Linear<B>,
}

impl<B: Backend> GaussianHead<B> {
    pub fn new(input: usize, hidden: usize, latent: usize, device: &B::Device) -> Self {
        Self {
            hidden1: LinearConfig::new(input, hidden).init(device),
            hidden2: LinearConfig::new(hidden, hidden).init(device),
            mean:    LinearConfig::new(hidden, latent).init(device),
            logvar:  LinearConfig::new(hidden, latent).init(device),
        }
    }

    /// [batch, input] → (mean, logvar), both [batch, latent]
    pub fn forward(&self, x: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let h = relu(self.hidden1.forward(x));
        let h = relu(self.hidden2.forward(h));
        let mean   = self.mean.forward(h.clone());
        let logvar = self.logvar.forward(h).clamp(LOGVAR_MIN, LOGVAR_MAX);
        (mean, logvar)
    }
}

/// Two ReLU layers followed by per-pixel Bernoulli logits.
#[derive(Module, Debug)]
pub struct BernoulliDecoder<B: Backend> {
    hidden1: Linear<B>,
    hidden2: Linear<B>,
    logits:  Linear<B>,
}

impl<B: Backend> BernoulliDecoder<B> {
    pub fn new(input: usize, hidden: usize, output: usize, device: &B::Device) -> Self {
        Self {
            hidden1: LinearConfig::new(input, hidden).init(device),
            hidden2: LinearConfig::new(hidden, hidden).init(device),
            logits:  LinearConfig::new(hidden, output).init(device),
        }
    }

    pub fn forward(&self, z: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = relu(self.hidden1.forward(z));
        let h = relu(self.hidden2.forward(h));
        self.logits.forward(h)
    }
}

// ─── ELBO ─────────────────────────────────────────────────────────────────────

/// Batch-mean loss terms, each of shape [1].
///
/// `loss = reconstruction + kl` is the negative ELBO.
pub struct ElboTerms<B: Backend> {
    pub loss:           Tensor<B, 1>,
    pub reconstruction: Tensor<B, 1>,
    pub kl:             Tensor<B, 1>,
}

impl<B: Backend> ElboTerms<B> {
    /// Build from per-example [batch] terms.
    pub fn from_per_example(reconstruction: Tensor<B, 1>, kl: Tensor<B, 1>) -> Self {
        let reconstruction = reconstruction.mean();
        let kl             = kl.mean();
        Self { loss: reconstruction.clone() + kl.clone(), reconstruction, kl }
    }
}

/// What the trainer needs from a model.
pub trait ElboModel<B: Backend> {
    /// Single-sample negative ELBO on a [batch, input_dim] batch.
    fn elbo(&self, x: Tensor<B, 2>) -> ElboTerms<B>;

    fn input_dim(&self) -> usize;
}

/// log p(z) under either N(0, I) or the VampPrior built from `encoder`.
pub fn log_prior<B: Backend>(
    z:       Tensor<B, 2>,
    prior:   Option<&PseudoInputs<B>>,
    encoder: &GaussianHead<B>,
) -> Tensor<B, 1> {
    match prior {
        None => log_standard_normal(z),
        Some(p) => {
            let (means, logvars) = encoder.forward(p.pseudo_inputs());
            log_mixture_normal(z, means, logvars)
        }
    }
}

// ─── VanillaVae ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct VanillaVae<B: Backend> {
    pub encoder: GaussianHead<B>,
    pub decoder: BernoulliDecoder<B>,
    pub prior:   Option<PseudoInputs<B>>,
    input_dim:   usize,
}

impl<B: Backend> ElboModel<B> for VanillaVae<B> {
    fn elbo(&self, x: Tensor<B, 2>) -> ElboTerms<B> {
        let (mean, logvar) = self.encoder.forward(x.clone());
        let z      = reparameterize(mean.clone(), logvar.clone());
        let logits = self.decoder.forward(z.clone());

        let log_px = log_bernoulli_logits(x, logits);
        let log_qz = log_normal_diag(z.clone(), mean, logvar);
        let log_pz = log_prior(z, self.prior.as_ref(), &self.encoder);

        ElboTerms::from_per_example(log_px.neg(), log_qz - log_pz)
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }
}

// ─── ExperimentModel ──────────────────────────────────────────────────────────
/// Either architecture, so the runner can hold "the model" without
/// knowing which one was chosen.
pub enum ExperimentModel<B: Backend> {
    Vanilla(VanillaVae<B>),
    Hierarchical(Hvae<B>),
}

impl<B: Backend> ElboModel<B> for ExperimentModel<B> {
    fn elbo(&self, x: Tensor<B, 2>) -> ElboTerms<B> {
        match self {
            ExperimentModel::Vanilla(m)      => m.elbo(x),
            ExperimentModel::Hierarchical(m) => m.elbo(x),
        }
    }

    fn input_dim(&self) -> usize {
        match self {
            ExperimentModel::Vanilla(m)      => m.input_dim(),
            ExperimentModel::Hierarchical(m) => m.input_dim(),
        }
    }
}

impl<B: Backend> ExperimentModel<B> {
    pub fn num_params(&self) -> usize {
        match self {
            ExperimentModel::Vanilla(m)      => m.num_params(),
            ExperimentModel::Hierarchical(m) => m.num_params(),
        }
    }
}
