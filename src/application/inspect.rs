// ============================================================
// Layer 2 — Inspect Use Case
// ============================================================
// Reloads a trained experiment and summarises it:
//
//   Step 1: Rebuild the runner with the saved run config
//   Step 2: reload_existing_model (fetch → prepare → resume)
//   Step 3: Score the restored model on the test split
//
// Nothing is trained and no file is written.

use anyhow::Result;
use burn::prelude::*;

use crate::application::runner::{Runner, RunnerConfig};
use crate::domain::{experiment::ExperimentKey, traits::DatasetSource};
use crate::infra::{
    checkpoint::CheckpointStore,
    history::{best_val_loss, HistoryRecord},
};
use crate::ml::{
    evaluator::{evaluate, EvalReport},
    model::ExperimentModel,
};

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub key:           ExperimentKey,
    pub completed:     usize,
    pub best_val_loss: f64,
    pub last:          Option<HistoryRecord>,
    pub num_params:    usize,
    pub test:          EvalReport,
}

pub struct InspectUseCase<S: DatasetSource> {
    key:    ExperimentKey,
    config: RunnerConfig,
    source: S,
}

impl<S: DatasetSource> InspectUseCase<S> {
    pub fn new(key: ExperimentKey, config: RunnerConfig, source: S) -> Self {
        Self { key, config, source }
    }

    pub fn execute<B: Backend>(self, device: B::Device) -> Result<InspectReport> {
        // ── Step 1: Run config ────────────────────────────────────────────────
        // Model widths come from the config saved at training time;
        // where to look for files still comes from the caller.
        let ckpt   = CheckpointStore::new(self.key.checkpoint_path(&self.config.root));
        let config = match ckpt.load_config()? {
            Some(saved) => RunnerConfig {
                root:     self.config.root.clone(),
                data_dir: self.config.data_dir.clone(),
                ..saved
            },
            None => {
                tracing::warn!(
                    "No run config beside '{}'; assuming the given model widths",
                    ckpt.path().display(),
                );
                self.config
            }
        };
        let batch_size = config.batch_size;

        // ── Step 2: Reload ────────────────────────────────────────────────────
        let mut runner = Runner::<B, S>::new(self.key, config, self.source, device.clone());
        let (model, history) = runner.reload_existing_model()?;

        // ── Step 3: Test loss ─────────────────────────────────────────────────
        let test = match runner.dataset() {
            Some(data) => evaluate::<B, ExperimentModel<B>>(&model, data.test.clone(), batch_size, &device),
            None       => anyhow::bail!("dataset was not fetched"),
        };
        tracing::info!("Test loss for {}: {:.4} over {} examples", self.key, test.loss, test.examples);

        Ok(InspectReport {
            key:           self.key,
            completed:     history.len(),
            best_val_loss: best_val_loss(&history),
            last:          history.last().copied(),
            num_params:    model.num_params(),
            test,
        })
    }
}
