// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model math lives here.
//
//   distributions.rs — log-densities (diagonal Gaussian, mixture,
//                      Bernoulli logits), log-sum-exp and the
//                      reparameterisation trick
//
//   pseudo_inputs.rs — the two VampPrior pseudo-input providers:
//                      first N training rows, or a learned
//                      Linear(N → D) generator
//
//   model.rs         — shared Gaussian/Bernoulli heads, ELBO terms,
//                      the one-layer VAE and ExperimentModel
//
//   hvae.rs          — the two-layer hierarchical VAE
//
//   trainer.rs       — Adam epoch loop with history + checkpoint
//
//   evaluator.rs     — gradient-free ELBO over a whole split
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Kingma & Welling (2014) Auto-Encoding Variational Bayes
//            Tomczak & Welling (2018) VAE with a VampPrior

pub mod distributions;

/// Data-derived and generated pseudo-inputs
pub mod pseudo_inputs;

/// VanillaVae, shared building blocks and the ElboModel trait
pub mod model;

/// Two stochastic layer VAE
pub mod hvae;

/// Training loop with validation and checkpointing
pub mod trainer;

pub mod evaluator;
