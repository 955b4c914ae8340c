// ============================================================
// Layer 3 — Experiment Identity and Path Builder
// ============================================================
// An experiment is identified by four values:
//
//   (dataset, architecture, prior configuration, epoch target)
//
// Each enum value has a fixed human-readable token. The tokens
// are substituted into two path templates:
//
//   {root}/checkpoints/{DATASET}_{ARCH}_{PRIOR}_{EPOCHS}.cpkt
//   {root}/history/{DATASET}_{ARCH}_{PRIOR}_{EPOCHS}.csv
//
// Identical tuples always give identical paths, so the pair of
// files acts as the cache key for resuming a run.
//
// Reference: Rust Book §6 (Enums), §8 (Strings)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

// ─── DatasetKey ───────────────────────────────────────────────────────────────
/// Which dataset an experiment trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKey {
    Mnist,
    Omniglot,
    Caltech,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 3] = [DatasetKey::Mnist, DatasetKey::Omniglot, DatasetKey::Caltech];

    /// Token used in checkpoint and history file names
    pub fn token(self) -> &'static str {
        match self {
            DatasetKey::Mnist    => "MNIST",
            DatasetKey::Omniglot => "OMNIGLOT",
            DatasetKey::Caltech  => "CALTECH",
        }
    }

    /// Number of pseudo-inputs a VampPrior uses on this dataset
    pub fn pseudo_input_count(self) -> usize {
        match self {
            DatasetKey::Omniglot => 1000,
            _                    => 500,
        }
    }
}

// ─── Architecture ─────────────────────────────────────────────────────────────
/// Which model-building logic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    Vanilla,
    Hierarchical,
}

impl Architecture {
    pub const ALL: [Architecture; 2] = [Architecture::Vanilla, Architecture::Hierarchical];

    pub fn token(self) -> &'static str {
        match self {
            Architecture::Vanilla      => "VANILLA",
            Architecture::Hierarchical => "HVAE",
        }
    }
}

// ─── PriorConfiguration ───────────────────────────────────────────────────────
/// Which latent prior the model uses, and where its pseudo-inputs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorConfiguration {
    /// N(0, I) — no pseudo-inputs
    StandardGaussian,
    /// VampPrior over the first N training examples
    VampPriorFromData,
    /// VampPrior over N learned, generated pseudo-inputs
    VampPriorFromGenerator,
}

impl PriorConfiguration {
    pub const ALL: [PriorConfiguration; 3] = [
        PriorConfiguration::StandardGaussian,
        PriorConfiguration::VampPriorFromData,
        PriorConfiguration::VampPriorFromGenerator,
    ];

    pub fn token(self) -> &'static str {
        match self {
            PriorConfiguration::StandardGaussian       => "SG",
            PriorConfiguration::VampPriorFromData      => "VAMPDATA",
            PriorConfiguration::VampPriorFromGenerator => "VAMPGEN",
        }
    }

    pub fn uses_pseudo_inputs(self) -> bool {
        self != PriorConfiguration::StandardGaussian
    }
}

// ─── Token lookup ─────────────────────────────────────────────────────────────
// Parsing is the only place an unknown identifier can appear,
// so this is where the lookup error is raised.

fn lookup<T: Copy>(kind: &str, s: &str, all: &[T], token: fn(T) -> &'static str) -> Result<T> {
    let wanted = s.trim().to_ascii_uppercase();
    if let Some(v) = all.iter().copied().find(|v| token(*v) == wanted) {
        return Ok(v);
    }
    let known: Vec<&str> = all.iter().map(|v| token(*v)).collect();
    bail!("unrecognised {kind} '{s}' (expected one of {})", known.join(", "))
}

impl FromStr for DatasetKey {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        lookup("dataset", s, &DatasetKey::ALL, DatasetKey::token)
    }
}

impl FromStr for Architecture {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        // "hierarchical" is accepted as a long form of HVAE
        if s.trim().eq_ignore_ascii_case("hierarchical") {
            return Ok(Architecture::Hierarchical);
        }
        lookup("architecture", s, &Architecture::ALL, Architecture::token)
    }
}

impl FromStr for PriorConfiguration {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        lookup("prior configuration", s, &PriorConfiguration::ALL, PriorConfiguration::token)
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.token()) }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.token()) }
}

impl fmt::Display for PriorConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.token()) }
}

// ─── ExperimentKey ────────────────────────────────────────────────────────────
/// The full identity of one experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentKey {
    pub dataset:      DatasetKey,
    pub architecture: Architecture,
    pub prior:        PriorConfiguration,
    pub epochs:       usize,
}

/// The two files an experiment reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPaths {
    pub checkpoint: PathBuf,
    pub history:    PathBuf,
}

impl ExperimentKey {
    pub fn new(
        dataset:      DatasetKey,
        architecture: Architecture,
        prior:        PriorConfiguration,
        epochs:       usize,
    ) -> Self {
        Self { dataset, architecture, prior, epochs }
    }

    /// `{DATASET}_{ARCH}_{PRIOR}_{EPOCHS}` — shared by both file names
    pub fn stem(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.dataset.token(),
            self.architecture.token(),
            self.prior.token(),
            self.epochs,
        )
    }

    pub fn checkpoint_path(&self, root: &str) -> PathBuf {
        PathBuf::from(format!("{root}/checkpoints/{}.cpkt", self.stem()))
    }

    pub fn history_path(&self, root: &str) -> PathBuf {
        PathBuf::from(format!("{root}/history/{}.csv", self.stem()))
    }

    pub fn paths(&self, root: &str) -> ExperimentPaths {
        ExperimentPaths {
            checkpoint: self.checkpoint_path(root),
            history:    self.history_path(root),
        }
    }
}

impl fmt::Display for ExperimentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnist_vanilla_sg_paths() {
        let key   = ExperimentKey::new(
            DatasetKey::Mnist,
            Architecture::Vanilla,
            PriorConfiguration::StandardGaussian,
            2000,
        );
        let paths = key.paths("..");
        assert_eq!(paths.checkpoint, PathBuf::from("../checkpoints/MNIST_VANILLA_SG_2000.cpkt"));
        assert_eq!(paths.history,    PathBuf::from("../history/MNIST_VANILLA_SG_2000.csv"));
    }

    #[test]
    fn test_paths_are_deterministic_for_every_tuple() {
        for d in DatasetKey::ALL {
            for a in Architecture::ALL {
                for p in PriorConfiguration::ALL {
                    let key = ExperimentKey::new(d, a, p, 37);
                    assert_eq!(key.paths("runs"), key.paths("runs"));
                }
            }
        }
    }

    #[test]
    fn test_distinct_tuples_get_distinct_stems() {
        let a = ExperimentKey::new(DatasetKey::Omniglot, Architecture::Hierarchical,
                                   PriorConfiguration::VampPriorFromGenerator, 10);
        let b = ExperimentKey { epochs: 20, ..a };
        assert_eq!(a.stem(), "OMNIGLOT_HVAE_VAMPGEN_10");
        assert_ne!(a.stem(), b.stem());
    }

    #[test]
    fn test_parse_tokens_case_insensitive() {
        assert_eq!("mnist".parse::<DatasetKey>().unwrap(), DatasetKey::Mnist);
        assert_eq!("HVAE".parse::<Architecture>().unwrap(), Architecture::Hierarchical);
        assert_eq!("hierarchical".parse::<Architecture>().unwrap(), Architecture::Hierarchical);
        assert_eq!("VampData".parse::<PriorConfiguration>().unwrap(),
                   PriorConfiguration::VampPriorFromData);
    }

    #[test]
    fn test_unknown_token_is_a_lookup_error() {
        let err = "cifar".parse::<DatasetKey>().unwrap_err().to_string();
        assert!(err.contains("unrecognised dataset 'cifar'"));
        assert!(err.contains("MNIST, OMNIGLOT, CALTECH"));
        assert!("VAMP".parse::<PriorConfiguration>().is_err());
    }

    #[test]
    fn test_pseudo_input_count_override() {
        assert_eq!(DatasetKey::Mnist.pseudo_input_count(),    500);
        assert_eq!(DatasetKey::Caltech.pseudo_input_count(),  500);
        assert_eq!(DatasetKey::Omniglot.pseudo_input_count(), 1000);
    }
}
