// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses flags with
// clap and delegates to Layer 2; results are printed here.
//
//   1. `train`   — run (or resume) one experiment
//   2. `inspect` — reload a trained experiment, report test loss
//   3. `paths`   — print where an experiment's files live
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, KeyArgs, TrainArgs};

use crate::application::{
    inspect::InspectUseCase,
    runner::{RunOutcome, Runner, RunnerConfig},
};
use crate::data::loader::VisionSource;

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
type EvalBackend  = burn::backend::Wgpu;

#[derive(Parser, Debug)]
#[command(
    name = "vampvae",
    version = "0.1.0",
    about = "Train and resume VAE / HVAE experiments with standard or VampPrior priors."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match &self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Inspect(args) => run_inspect(args),
            Commands::Paths(args)   => run_paths(args),
        }
    }
}

fn run_train(args: &TrainArgs) -> Result<()> {
    let key    = args.key.key();
    let config = RunnerConfig::from(args);
    let source = VisionSource::new(&config.data_dir);
    let device = burn::backend::wgpu::WgpuDevice::default();

    tracing::info!("Starting experiment {}", key);
    let mut runner = Runner::<TrainBackend, _>::new(key, config, source, device);

    match runner.run()? {
        RunOutcome::AlreadyComplete { completed, history } => {
            println!(
                "{key} has already been trained ({completed} epochs recorded).\n\
                 Delete {} to retrain.",
                history.display(),
            );
        }
        RunOutcome::Trained { epochs_run, completed, best_val_loss } => {
            println!(
                "Trained {key} for {epochs_run} epochs ({completed}/{} done). Best val_loss: {best_val_loss:.4}",
                key.epochs,
            );
            println!("Checkpoint: {}", runner.paths().checkpoint.display());
        }
    }
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let key    = args.key.key();
    let config = RunnerConfig::from(args);
    let source = VisionSource::new(&config.data_dir);
    let device = burn::backend::wgpu::WgpuDevice::default();

    let report = InspectUseCase::new(key, config, source).execute::<EvalBackend>(device)?;

    println!("Experiment:     {}", report.key);
    println!("Epochs done:    {}/{}", report.completed, report.key.epochs);
    println!("Parameters:     {}", report.num_params);
    println!("Best val_loss:  {:.4}", report.best_val_loss);
    if let Some(last) = report.last {
        println!("Last epoch:     {} (loss {:.4}, val_loss {:.4})", last.epoch, last.loss, last.val_loss);
    }
    println!(
        "Test loss:      {:.4} (reconstruction {:.4}, KL {:.4}) over {} examples",
        report.test.loss, report.test.reconstruction, report.test.kl, report.test.examples,
    );
    Ok(())
}

fn run_paths(args: &KeyArgs) -> Result<()> {
    let paths = args.key().paths(&args.root);
    println!("checkpoint: {}", paths.checkpoint.display());
    println!("history:    {}", paths.history.display());
    Ok(())
}
