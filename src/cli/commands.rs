// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `inspect` and `paths`,
// and all their configurable flags.
//
// Dataset, architecture and prior are parsed through their
// FromStr impls, so an unknown token is rejected by clap with
// the lookup error.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::runner::RunnerConfig;
use crate::domain::experiment::{Architecture, DatasetKey, ExperimentKey, PriorConfiguration};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train an experiment, resuming from its history if one exists
    Train(TrainArgs),

    /// Reload a trained experiment and report its test loss
    Inspect(InspectArgs),

    /// Print the checkpoint and history paths of an experiment
    Paths(KeyArgs),
}

/// The experiment tuple plus where its files live.
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// MNIST, OMNIGLOT or CALTECH
    #[arg(long)]
    pub dataset: DatasetKey,

    /// VANILLA or HVAE
    #[arg(long)]
    pub architecture: Architecture,

    /// SG (standard Gaussian), VAMPDATA or VAMPGEN
    #[arg(long)]
    pub prior: PriorConfiguration,

    /// Total epoch target; part of the file names
    #[arg(long, default_value_t = 2000)]
    pub epochs: usize,

    /// Parent of the checkpoints/ and history/ directories
    #[arg(long, default_value = "..")]
    pub root: String,
}

impl KeyArgs {
    pub fn key(&self) -> ExperimentKey {
        ExperimentKey::new(self.dataset, self.architecture, self.prior, self.epochs)
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Parent of the omniglot/ and caltech/ image folders
    #[arg(long, default_value = "../data")]
    pub data_dir: String,

    /// Adam learning rate
    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Width of every hidden layer
    #[arg(long, default_value_t = 300)]
    pub hidden_dim: usize,

    /// Width of every stochastic layer
    #[arg(long, default_value_t = 40)]
    pub latent_dim: usize,

    /// Shuffle seed; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Convert CLI TrainArgs into the application-layer RunnerConfig.
/// The application layer never sees clap types.
impl From<&TrainArgs> for RunnerConfig {
    fn from(a: &TrainArgs) -> Self {
        RunnerConfig {
            root:          a.key.root.clone(),
            data_dir:      a.data_dir.clone(),
            learning_rate: a.lr,
            batch_size:    a.batch_size,
            hidden_dim:    a.hidden_dim,
            latent_dim:    a.latent_dim,
            seed:          a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    #[arg(long, default_value = "../data")]
    pub data_dir: String,
}

impl From<&InspectArgs> for RunnerConfig {
    fn from(a: &InspectArgs) -> Self {
        RunnerConfig {
            root:     a.key.root.clone(),
            data_dir: a.data_dir.clone(),
            ..RunnerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from([
            "vampvae", "train", "--dataset", "mnist", "--architecture", "VANILLA", "--prior", "SG",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg = RunnerConfig::from(&args);
        assert_eq!(cfg, RunnerConfig::default());
        assert_eq!(args.key.key().stem(), "MNIST_VANILLA_SG_2000");
    }

    #[test]
    fn test_unknown_prior_is_rejected() {
        let result = Cli::try_parse_from([
            "vampvae", "paths", "--dataset", "MNIST", "--architecture", "HVAE", "--prior", "FLOW",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_paths_flags() {
        let cli = Cli::try_parse_from([
            "vampvae", "paths", "--dataset", "OMNIGLOT", "--architecture", "HVAE",
            "--prior", "VAMPGEN", "--epochs", "10", "--root", "/runs",
        ])
        .unwrap();
        let Commands::Paths(args) = cli.command else { panic!("expected paths") };
        let paths = args.key().paths(&args.root);
        assert_eq!(paths.checkpoint.to_str(), Some("/runs/checkpoints/OMNIGLOT_HVAE_VAMPGEN_10.cpkt"));
    }
}
