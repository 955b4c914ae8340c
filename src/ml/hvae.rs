// ============================================================
// Layer 5 — Hierarchical VAE
// ============================================================
// Two stochastic layers, z2 on top of z1:
//
//   inference   q(z2 | x)          q(z1 | x, z2)
//   generative  p(z2)              p(z1 | z2)        p(x | z1, z2)
//
// The configurable prior (standard Gaussian or VampPrior) sits
// on z2; for a VampPrior it is the mixture of q(z2 | u_k).
//
//   −ELBO = −log p(x|z1,z2)
//           + [log q(z1|x,z2) − log p(z1|z2)]
//           + [log q(z2|x)    − log p(z2)]
//
// Reference: Tomczak & Welling (2018) VAE with a VampPrior, §3

use burn::prelude::*;

use crate::ml::distributions::{log_bernoulli_logits, log_normal_diag, reparameterize};
use crate::ml::model::{
    log_prior, BernoulliDecoder, ElboModel, ElboTerms, GaussianHead, VaeConfig,
};
use crate::ml::pseudo_inputs::PseudoInputs;

impl VaeConfig {
    pub fn init_hvae<B: Backend>(
        &self,
        prior:  Option<PseudoInputs<B>>,
        device: &B::Device,
    ) -> Hvae<B> {
        let (d, h, l) = (self.input_dim, self.hidden_dim, self.latent_dim);
        Hvae {
            q_z2:    GaussianHead::new(d, h, l, device),
            q_z1:    GaussianHead::new(d + l, h, l, device),
            p_z1:    GaussianHead::new(l, h, l, device),
            decoder: BernoulliDecoder::new(2 * l, h, d, device),
            prior,
            input_dim: d,
        }
    }
}

#[derive(Module, Debug)]
pub struct Hvae<B: Backend> {
    /// q(z2 | x) — also encodes pseudo-inputs for the VampPrior
    pub q_z2:    GaussianHead<B>,
    /// q(z1 | x, z2)
    pub q_z1:    GaussianHead<B>,
    /// p(z1 | z2)
    pub p_z1:    GaussianHead<B>,
    /// p(x | z1, z2)
    pub decoder: BernoulliDecoder<B>,
    pub prior:   Option<PseudoInputs<B>>,
    input_dim:   usize,
}

impl<B: Backend> ElboModel<B> for Hvae<B> {
    fn elbo(&self, x: Tensor<B, 2>) -> ElboTerms<B> {
        // inference pass, top-down from z2
        let (z2_mean, z2_logvar) = self.q_z2.forward(x.clone());
        let z2 = reparameterize(z2_mean.clone(), z2_logvar.clone());

        let (z1_mean, z1_logvar) = self.q_z1.forward(Tensor::cat(vec![x.clone(), z2.clone()], 1));
        let z1 = reparameterize(z1_mean.clone(), z1_logvar.clone());

        // generative pass
        let (p_mean, p_logvar) = self.p_z1.forward(z2.clone());
        let logits = self.decoder.forward(Tensor::cat(vec![z1.clone(), z2.clone()], 1));

        let log_px    = log_bernoulli_logits(x, logits);
        let log_q_z1  = log_normal_diag(z1.clone(), z1_mean, z1_logvar);
        let log_p_z1  = log_normal_diag(z1, p_mean, p_logvar);
        let log_q_z2  = log_normal_diag(z2.clone(), z2_mean, z2_logvar);
        let log_p_z2  = log_prior(z2, self.prior.as_ref(), &self.q_z2);

        let kl = (log_q_z1 - log_p_z1) + (log_q_z2 - log_p_z2);
        ElboTerms::from_per_example(log_px.neg(), kl)
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::pseudo_inputs::GeneratedPseudoInputs;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn ones(rows: usize, dim: usize) -> Tensor<TB, 2> {
        Tensor::ones([rows, dim], &Default::default())
    }

    #[test]
    fn test_hvae_elbo_terms_add_up() {
        let model = VaeConfig::new(10)
            .with_hidden_dim(6)
            .with_latent_dim(2)
            .init_hvae::<TB>(None, &Default::default());
        let terms = model.elbo(ones(3, 10));
        let loss: f32 = terms.loss.into_scalar();
        let rec:  f32 = terms.reconstruction.into_scalar();
        let kl:   f32 = terms.kl.into_scalar();
        assert!(loss.is_finite());
        assert!((loss - (rec + kl)).abs() < 1e-4);
    }

    #[test]
    fn test_hvae_with_generated_vampprior() {
        let device = Default::default();
        let prior  = PseudoInputs::generated(GeneratedPseudoInputs::<TB>::new(5, 10, &device));
        let model  = VaeConfig::new(10)
            .with_hidden_dim(6)
            .with_latent_dim(2)
            .init_hvae(Some(prior), &device);
        assert_eq!(model.input_dim(), 10);
        let loss: f32 = model.elbo(ones(2, 10)).loss.into_scalar();
        assert!(loss.is_finite());
    }
}
