// ============================================================
// Layer 5 — Log-densities
// ============================================================
// Per-example log-densities used by the ELBO. Every function
// takes [batch, dim] tensors and returns [batch] — the density
// is summed over the feature dimension.
//
//   log N(x; μ, σ²)  = -½ (log 2π + log σ² + (x-μ)² / σ²)
//   log Bern(x; l)   = x·l − softplus(l)
//   log Σ_k exp(a_k) = m + log Σ_k exp(a_k − m),  m = max_k a_k

use burn::prelude::*;

const LOG_2PI: f64 = 1.837_877_066_409_345_5;

/// Bounds for every predicted log-variance
pub const LOGVAR_MIN: f64 = -6.0;
pub const LOGVAR_MAX: f64 = 2.0;

/// [batch, dim] → [batch] by summing over dim 1
fn sum_features<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 1> {
    x.sum_dim(1).flatten::<1>(0, 1)
}

/// Diagonal Gaussian log-density.
pub fn log_normal_diag<B: Backend>(
    x:      Tensor<B, 2>,
    mean:   Tensor<B, 2>,
    logvar: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let sq = (x - mean).powf_scalar(2.0) / logvar.clone().exp();
    sum_features((logvar + sq).add_scalar(LOG_2PI).mul_scalar(-0.5))
}

/// N(0, I) log-density.
pub fn log_standard_normal<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 1> {
    sum_features(x.powf_scalar(2.0).add_scalar(LOG_2PI).mul_scalar(-0.5))
}

/// Bernoulli log-likelihood of `x` in [0, 1] under `logits`.
pub fn log_bernoulli_logits<B: Backend>(x: Tensor<B, 2>, logits: Tensor<B, 2>) -> Tensor<B, 1> {
    let softplus = logits.clone().clamp_min(0.0)
        + logits.clone().abs().neg().exp().add_scalar(1.0).log();
    sum_features(x * logits - softplus)
}

/// Numerically stable log-sum-exp over `dim`, keeping the reduced dim.
pub fn log_sum_exp<B: Backend>(x: Tensor<B, 2>, dim: usize) -> Tensor<B, 2> {
    let dims = x.dims();
    let max  = x.clone().max_dim(dim).detach();
    let shifted = x - max.clone().expand(dims);
    shifted.exp().sum_dim(dim).log() + max
}

/// Log-density of `z` under a uniform mixture of diagonal Gaussians.
///
/// `z`: [batch, L], `means` / `logvars`: [K, L] → [batch]
pub fn log_mixture_normal<B: Backend>(
    z:       Tensor<B, 2>,
    means:   Tensor<B, 2>,
    logvars: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let [batch, latent] = z.dims();
    let [k, _]          = means.dims();

    let z3  = z.unsqueeze_dim::<3>(1).expand([batch, k, latent]);
    let mu3 = means.unsqueeze_dim::<3>(0).expand([batch, k, latent]);
    let lv3 = logvars.unsqueeze_dim::<3>(0).expand([batch, k, latent]);

    let sq = (z3 - mu3).powf_scalar(2.0) / lv3.clone().exp();
    // [batch, k, latent] → [batch, k]
    let per_component = (lv3 + sq)
        .add_scalar(LOG_2PI)
        .mul_scalar(-0.5)
        .sum_dim(2)
        .reshape([batch, k]);

    log_sum_exp(per_component, 1)
        .flatten::<1>(0, 1)
        .sub_scalar((k as f64).ln())
}

/// z = μ + σ·ε with ε ~ N(0, I)
pub fn reparameterize<B: Backend>(mean: Tensor<B, 2>, logvar: Tensor<B, 2>) -> Tensor<B, 2> {
    let std   = logvar.mul_scalar(0.5).exp();
    let noise = Tensor::random(mean.shape(), burn::tensor::Distribution::Normal(0.0, 1.0), &mean.device());
    mean + noise * std
}
