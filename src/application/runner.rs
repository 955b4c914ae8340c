// ============================================================
// Layer 2 — Experiment Runner
// ============================================================
// Orchestrates one experiment in order:
//
//   Created
//     │  fetch_dataset        (Layer 4 - data)
//     ▼
//   DatasetFetched
//     │  prepare_model        (Layer 5 - ml: prior + architecture)
//     ▼
//   ModelPrepared
//     │  reload_if_possible   (Layer 6 - infra: history + checkpoint)
//     ▼
//   ResumeChecked
//     │  remaining == 0 ──────────────► AlreadyComplete
//     ▼
//   Training ──► Done                  (Layer 5 - ml: fit)
//
// The history row count is the number of completed epochs; the
// runner only trains what is left of the epoch target.
//
// Reference: Clean Architecture pattern
//            Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use burn::{prelude::*, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

use crate::data::dataset::DatasetPair;
use crate::domain::{
    experiment::{Architecture, ExperimentKey, ExperimentPaths, PriorConfiguration},
    traits::DatasetSource,
};
use crate::infra::{
    checkpoint::CheckpointStore,
    history::{best_val_loss, HistoryLog, HistoryRecord},
};
use crate::ml::{
    model::{ElboModel, ExperimentModel, VaeConfig},
    pseudo_inputs::{DataPseudoInputs, GeneratedPseudoInputs, PseudoInputs},
    trainer::{fit, FitOptions},
};

// ─── Runner Configuration ─────────────────────────────────────────────────────
// Everything about a run that is not part of the experiment key.
// Saved as JSON beside the checkpoint so the model can be rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Parent of the `checkpoints/` and `history/` directories
    pub root:          String,
    /// Parent of the `omniglot/` and `caltech/` image folders
    pub data_dir:      String,
    pub learning_rate: f64,
    pub batch_size:    usize,
    pub hidden_dim:    usize,
    pub latent_dim:    usize,
    /// Shuffle seed; a random one is drawn per run when unset
    pub seed:          Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            root:          "..".to_string(),
            data_dir:      "../data".to_string(),
            learning_rate: 0.001,
            batch_size:    100,
            hidden_dim:    300,
            latent_dim:    40,
            seed:          None,
        }
    }
}

// ─── Stages and outcomes ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStage {
    Created,
    DatasetFetched,
    ModelPrepared,
    ResumeChecked,
    Training,
    Done,
    AlreadyComplete,
}

impl fmt::Display for RunnerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The history already covers the epoch target; nothing was trained
    AlreadyComplete { completed: usize, history: PathBuf },
    Trained { epochs_run: usize, completed: usize, best_val_loss: f64 },
}

/// Epochs still to train for `target` after `completed` rows.
pub fn remaining_epochs(target: usize, completed: usize) -> usize {
    target.saturating_sub(completed)
}

// ─── Runner ───────────────────────────────────────────────────────────────────
pub struct Runner<B: Backend, S: DatasetSource> {
    key:       ExperimentKey,
    config:    RunnerConfig,
    paths:     ExperimentPaths,
    source:    S,
    device:    B::Device,
    stage:     RunnerStage,
    data:      Option<DatasetPair>,
    model:     Option<ExperimentModel<B>>,
    history:   Vec<HistoryRecord>,
    remaining: usize,
}

impl<B: Backend, S: DatasetSource> Runner<B, S> {
    pub fn new(key: ExperimentKey, config: RunnerConfig, source: S, device: B::Device) -> Self {
        let paths = key.paths(&config.root);
        Self {
            key,
            config,
            paths,
            source,
            device,
            stage:     RunnerStage::Created,
            data:      None,
            model:     None,
            history:   Vec::new(),
            remaining: key.epochs,
        }
    }

    pub fn key(&self) -> &ExperimentKey { &self.key }
    pub fn paths(&self) -> &ExperimentPaths { &self.paths }
    pub fn stage(&self) -> RunnerStage { self.stage }
    pub fn dataset(&self) -> Option<&DatasetPair> { self.data.as_ref() }
    pub fn model(&self) -> Option<&ExperimentModel<B>> { self.model.as_ref() }
    pub fn remaining_epochs(&self) -> usize { self.remaining }
    pub fn completed_epochs(&self) -> usize { self.history.len() }

    fn advance(&mut self, from: RunnerStage, to: RunnerStage) -> Result<()> {
        if self.stage != from {
            bail!("runner for {} is at stage {}; cannot move to {}", self.key, self.stage, to);
        }
        tracing::debug!("{}: {} → {}", self.key, from, to);
        self.stage = to;
        Ok(())
    }

    fn history_log(&self) -> HistoryLog { HistoryLog::new(&self.paths.history) }
    fn checkpoint(&self) -> CheckpointStore { CheckpointStore::new(&self.paths.checkpoint) }

    /// Created → DatasetFetched
    pub fn fetch_dataset(&mut self) -> Result<()> {
        if self.stage != RunnerStage::Created {
            return self.advance(RunnerStage::Created, RunnerStage::DatasetFetched);
        }
        let pair = self.source
            .load(self.key.dataset)
            .with_context(|| format!("Cannot fetch dataset {}", self.key.dataset))?;
        self.data = Some(pair);
        self.advance(RunnerStage::Created, RunnerStage::DatasetFetched)
    }

    /// DatasetFetched → ModelPrepared
    pub fn prepare_model(&mut self) -> Result<()> {
        if self.stage != RunnerStage::DatasetFetched {
            return self.advance(RunnerStage::DatasetFetched, RunnerStage::ModelPrepared);
        }
        let data   = self.data.as_ref().context("dataset was not fetched")?;
        let train  = &data.train;
        let device = &self.device;
        let n      = self.key.dataset.pseudo_input_count();
        if self.key.prior.uses_pseudo_inputs() {
            tracing::info!("{} prior: {} pseudo-inputs requested", self.key.prior, n);
        }

        let prior = match self.key.prior {
            PriorConfiguration::StandardGaussian       => None,
            PriorConfiguration::VampPriorFromData      => Some(PseudoInputs::from_data(
                DataPseudoInputs::from_training_set(train, n, device),
            )),
            PriorConfiguration::VampPriorFromGenerator => Some(PseudoInputs::generated(
                GeneratedPseudoInputs::new(n, train.input_dim(), device),
            )),
        };

        let model_cfg = VaeConfig::new(train.input_dim())
            .with_hidden_dim(self.config.hidden_dim)
            .with_latent_dim(self.config.latent_dim);

        let model = match self.key.architecture {
            Architecture::Vanilla      => ExperimentModel::Vanilla(model_cfg.init_vanilla(prior, device)),
            Architecture::Hierarchical => ExperimentModel::Hierarchical(model_cfg.init_hvae(prior, device)),
        };

        tracing::info!(
            "Model ready: {} with {} prior ({} params, input_dim={}, lr={})",
            self.key.architecture,
            self.key.prior,
            model.num_params(),
            model.input_dim(),
            self.config.learning_rate,
        );

        self.model = Some(model);
        self.advance(RunnerStage::DatasetFetched, RunnerStage::ModelPrepared)
    }

    /// ModelPrepared → ResumeChecked
    ///
    /// Restores weights and shrinks the remaining epochs when the
    /// history file already holds completed rows.
    pub fn reload_if_possible(&mut self) -> Result<()> {
        if self.stage != RunnerStage::ModelPrepared {
            return self.advance(RunnerStage::ModelPrepared, RunnerStage::ResumeChecked);
        }
        let history = self.history_log();
        let ckpt    = self.checkpoint();

        let rows = history.read()?.unwrap_or_default();
        if rows.is_empty() {
            if ckpt.exists() {
                tracing::warn!(
                    "Checkpoint '{}' exists without history; starting from epoch 0 and overwriting it",
                    ckpt.path().display(),
                );
            }
            self.remaining = self.key.epochs;
            return self.advance(RunnerStage::ModelPrepared, RunnerStage::ResumeChecked);
        }

        if !ckpt.exists() {
            bail!(
                "history '{}' records {} completed epochs but checkpoint '{}' is missing; \
                 delete the history file to retrain from scratch",
                history.path().display(),
                rows.len(),
                ckpt.path().display(),
            );
        }

        let model = self.model.take().context("model was not prepared")?;

        // dummy forward pass on a zero batch of shape [1, ...dims], flattened
        let probe = Tensor::<B, 2>::zeros([1, model.input_dim()], &self.device);
        let probe_loss: f64 = model.elbo(probe).loss.into_scalar().elem();
        tracing::debug!("Probe pass before restore: loss={:.4}", probe_loss);

        let model = match model {
            ExperimentModel::Vanilla(m)      => ExperimentModel::Vanilla(ckpt.load_model::<B, _>(m, &self.device)?),
            ExperimentModel::Hierarchical(m) => ExperimentModel::Hierarchical(ckpt.load_model::<B, _>(m, &self.device)?),
        };
        self.model = Some(model);

        self.remaining = remaining_epochs(self.key.epochs, rows.len());
        tracing::info!(
            "Resuming {}: {} epochs done, {} remaining",
            self.key, rows.len(), self.remaining,
        );
        self.history = rows;
        self.advance(RunnerStage::ModelPrepared, RunnerStage::ResumeChecked)
    }

    /// Fetch, prepare and restore a model that has already been trained,
    /// returning it with its full history.
    pub fn reload_existing_model(&mut self) -> Result<(ExperimentModel<B>, Vec<HistoryRecord>)> {
        self.fetch_dataset()?;
        self.prepare_model()?;
        self.reload_if_possible()?;

        if self.history.is_empty() {
            bail!(
                "nothing has been trained for {} yet (no rows in '{}')",
                self.key,
                self.paths.history.display(),
            );
        }
        let model = self.model.take().context("model was not prepared")?;
        Ok((model, self.history.clone()))
    }
}

impl<B: AutodiffBackend, S: DatasetSource> Runner<B, S> {
    /// Run the whole experiment, resuming where the history left off.
    pub fn run(&mut self) -> Result<RunOutcome> {
        self.fetch_dataset()?;
        self.prepare_model()?;
        self.reload_if_possible()?;

        let completed = self.completed_epochs();
        if self.remaining == 0 {
            self.advance(RunnerStage::ResumeChecked, RunnerStage::AlreadyComplete)?;
            tracing::info!(
                "{} has already been trained for {} epochs ({} recorded); \
                 delete '{}' to retrain",
                self.key, self.key.epochs, completed, self.paths.history.display(),
            );
            return Ok(RunOutcome::AlreadyComplete { completed, history: self.paths.history.clone() });
        }

        self.advance(RunnerStage::ResumeChecked, RunnerStage::Training)?;

        let ckpt    = self.checkpoint();
        let history = self.history_log();
        ckpt.save_config(&self.config)?;

        let opts = FitOptions {
            epochs:        self.remaining,
            initial_epoch: completed,
            batch_size:    self.config.batch_size,
            learning_rate: self.config.learning_rate,
            shuffle_seed:  self.config.seed.unwrap_or_else(rand::random),
            best_val_loss: best_val_loss(&self.history),
        };
        tracing::info!("Training {} for {} epochs (from epoch {})", self.key, opts.epochs, completed);

        let data  = self.data.as_ref().context("dataset was not fetched")?;
        let model = self.model.take().context("model was not prepared")?;

        let (model, summary) = match model {
            ExperimentModel::Vanilla(m) => {
                let (m, s) = fit::<B, _>(m, data, &opts, &history, &ckpt, &self.device)?;
                (ExperimentModel::Vanilla(m), s)
            }
            ExperimentModel::Hierarchical(m) => {
                let (m, s) = fit::<B, _>(m, data, &opts, &history, &ckpt, &self.device)?;
                (ExperimentModel::Hierarchical(m), s)
            }
        };

        self.model = Some(model);
        self.history = history.read()?.unwrap_or_default();
        self.remaining = 0;
        self.advance(RunnerStage::Training, RunnerStage::Done)?;

        tracing::info!("Training complete! best val_loss={:.4}", summary.best_val_loss);
        Ok(RunOutcome::Trained {
            epochs_run:    summary.epochs_run,
            completed:     completed + summary.epochs_run,
            best_val_loss: summary.best_val_loss,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::ImageSet;
    use crate::domain::experiment::DatasetKey;
    use crate::ml::pseudo_inputs::PseudoInputProvider;
    use burn::backend::{Autodiff, NdArray};
    use std::fs;

    type TB = Autodiff<NdArray>;

    /// Hands out a fixed, tiny dataset for any key
    struct InMemorySource;

    impl DatasetSource for InMemorySource {
        fn load(&self, _key: DatasetKey) -> Result<DatasetPair> {
            let image = |rows: usize| {
                let pixels = (0..rows * 6).map(|i| ((i * 5) % 7) as f32 / 6.0).collect();
                ImageSet::new(vec![2, 3], pixels).unwrap()
            };
            DatasetPair::new(image(10), image(5))
        }
    }

    fn config(root: &std::path::Path) -> RunnerConfig {
        RunnerConfig {
            root:          root.display().to_string(),
            data_dir:      root.display().to_string(),
            learning_rate: 0.01,
            batch_size:    5,
            hidden_dim:    4,
            latent_dim:    2,
            seed:          Some(7),
        }
    }

    fn key(arch: Architecture, prior: PriorConfiguration, epochs: usize) -> ExperimentKey {
        ExperimentKey::new(DatasetKey::Mnist, arch, prior, epochs)
    }

    fn runner(root: &std::path::Path, key: ExperimentKey) -> Runner<TB, InMemorySource> {
        Runner::new(key, config(root), InMemorySource, Default::default())
    }

    fn history_rows(r: &Runner<TB, InMemorySource>) -> Vec<HistoryRecord> {
        HistoryLog::new(&r.paths().history).read().unwrap().unwrap_or_default()
    }

    #[test]
    fn test_remaining_epochs() {
        assert_eq!(remaining_epochs(2000, 500), 1500);
        assert_eq!(remaining_epochs(10, 0),     10);
        assert_eq!(remaining_epochs(10, 10),    0);
        assert_eq!(remaining_epochs(10, 12),    0);
    }

    #[test]
    fn test_fresh_run_trains_full_target() {
        let tmp = tempfile::tempdir().unwrap();
        let mut r = runner(tmp.path(), key(Architecture::Vanilla, PriorConfiguration::StandardGaussian, 3));

        let outcome = r.run().unwrap();
        assert!(matches!(outcome, RunOutcome::Trained { epochs_run: 3, completed: 3, .. }));
        assert_eq!(r.stage(), RunnerStage::Done);

        let rows = history_rows(&r);
        assert_eq!(rows.iter().map(|h| h.epoch).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(r.paths().checkpoint.is_file());
        assert!(r.paths().checkpoint.with_extension("json").is_file());
    }

    #[test]
    fn test_completed_run_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let k   = key(Architecture::Vanilla, PriorConfiguration::StandardGaussian, 2);
        runner(tmp.path(), k).run().unwrap();

        let mut again = runner(tmp.path(), k);
        let outcome = again.run().unwrap();
        assert_eq!(
            outcome,
            RunOutcome::AlreadyComplete { completed: 2, history: again.paths().history.clone() },
        );
        assert_eq!(again.stage(), RunnerStage::AlreadyComplete);
        assert_eq!(history_rows(&again).len(), 2);
    }

    #[test]
    fn test_truncated_history_trains_only_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let k   = key(Architecture::Hierarchical, PriorConfiguration::VampPriorFromData, 3);
        let first = {
            let mut r = runner(tmp.path(), k);
            r.run().unwrap();
            r.paths().clone()
        };

        // keep only the first completed epoch
        let text = fs::read_to_string(&first.history).unwrap();
        fs::write(&first.history, format!("{}\n", text.lines().next().unwrap())).unwrap();

        let mut r = runner(tmp.path(), k);
        r.fetch_dataset().unwrap();
        r.prepare_model().unwrap();
        r.reload_if_possible().unwrap();
        assert_eq!(r.completed_epochs(), 1);
        assert_eq!(r.remaining_epochs(), 2);

        let mut r = runner(tmp.path(), k);
        let outcome = r.run().unwrap();
        assert!(matches!(outcome, RunOutcome::Trained { epochs_run: 2, completed: 3, .. }));
        let epochs: Vec<usize> = history_rows(&r).iter().map(|h| h.epoch).collect();
        assert_eq!(epochs, vec![0, 1, 2]);
    }

    #[test]
    fn test_resume_keeps_better_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let k   = key(Architecture::Vanilla, PriorConfiguration::StandardGaussian, 4);
        let paths = {
            let mut r = runner(tmp.path(), k);
            r.run().unwrap();
            r.paths().clone()
        };

        // one recorded epoch whose val_loss nothing can beat
        fs::write(&paths.history, "0,1.0,-1000000000.0\n").unwrap();
        let saved = fs::read(&paths.checkpoint).unwrap();

        let mut r = runner(tmp.path(), k);
        let outcome = r.run().unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Trained { epochs_run: 3, completed: 4, best_val_loss: -1e9 },
        );
        assert_eq!(fs::read(&paths.checkpoint).unwrap(), saved);

        let epochs: Vec<usize> = history_rows(&r).iter().map(|h| h.epoch).collect();
        assert_eq!(epochs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_checkpoint_without_history_starts_fresh() {
        let tmp = tempfile::tempdir().unwrap();
        let mut r = runner(tmp.path(), key(Architecture::Hierarchical, PriorConfiguration::VampPriorFromGenerator, 2));
        let ckpt = r.paths().checkpoint.clone();
        fs::create_dir_all(ckpt.parent().unwrap()).unwrap();
        fs::write(&ckpt, b"left over from another run").unwrap();

        let outcome = r.run().unwrap();
        assert!(matches!(outcome, RunOutcome::Trained { epochs_run: 2, completed: 2, .. }));
        assert_ne!(fs::read(&ckpt).unwrap(), b"left over from another run");
        assert_eq!(history_rows(&r).len(), 2);
    }

    #[test]
    fn test_history_without_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut r = runner(tmp.path(), key(Architecture::Vanilla, PriorConfiguration::StandardGaussian, 4));
        HistoryLog::new(&r.paths().history)
            .append(&HistoryRecord::new(0, 1.0, 1.0))
            .unwrap();

        let err = r.run().unwrap_err().to_string();
        assert!(err.contains("checkpoint"));
        assert!(err.contains("delete the history file"));
    }

    #[test]
    fn test_steps_must_run_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut r = runner(tmp.path(), key(Architecture::Vanilla, PriorConfiguration::StandardGaussian, 1));
        assert!(r.prepare_model().is_err());
        assert!(r.reload_if_possible().is_err());
        assert_eq!(r.stage(), RunnerStage::Created);

        r.fetch_dataset().unwrap();
        assert!(r.fetch_dataset().is_err());
        assert_eq!(r.stage(), RunnerStage::DatasetFetched);
    }

    #[test]
    fn test_prepare_builds_requested_prior() {
        let tmp = tempfile::tempdir().unwrap();
        let prepared = |arch, prior| {
            let mut r = runner(tmp.path(), key(arch, prior, 1));
            r.fetch_dataset().unwrap();
            r.prepare_model().unwrap();
            r
        };

        let r = prepared(Architecture::Vanilla, PriorConfiguration::StandardGaussian);
        match r.model().unwrap() {
            ExperimentModel::Vanilla(m) => assert!(m.prior.is_none()),
            _ => panic!("expected a vanilla model"),
        }

        // MNIST asks for 500 pseudo-inputs; only 10 training rows exist
        let r = prepared(Architecture::Vanilla, PriorConfiguration::VampPriorFromData);
        match r.model().unwrap() {
            ExperimentModel::Vanilla(m) => {
                let p = m.prior.as_ref().unwrap();
                assert!(!p.is_generated());
                assert_eq!(p.count(), 10);
            }
            _ => panic!("expected a vanilla model"),
        }

        let r = prepared(Architecture::Hierarchical, PriorConfiguration::VampPriorFromGenerator);
        match r.model().unwrap() {
            ExperimentModel::Hierarchical(m) => {
                let p = m.prior.as_ref().unwrap();
                assert!(p.is_generated());
                assert_eq!(p.count(), 500);
            }
            _ => panic!("expected a hierarchical model"),
        }
    }

    #[test]
    fn test_reload_existing_model_returns_history() {
        let tmp = tempfile::tempdir().unwrap();
        let k   = key(Architecture::Vanilla, PriorConfiguration::VampPriorFromGenerator, 2);

        let mut empty = runner(tmp.path(), k);
        assert!(empty.reload_existing_model().is_err());

        runner(tmp.path(), k).run().unwrap();
        let (model, history) = runner(tmp.path(), k).reload_existing_model().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(model.input_dim(), 6);
    }
}
