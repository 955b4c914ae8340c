// ============================================================
// Layer 6 — Checkpoint Store
// ============================================================
// Saves and restores the weights of one experiment at its
// derived checkpoint path, plus the run configuration beside it:
//
//   checkpoints/
//     MNIST_VANILLA_SG_2000.cpkt   ← weights (burn BinBytesRecorder)
//     MNIST_VANILLA_SG_2000.json   ← RunnerConfig used to build the model
//
// File recorders in burn append their own extension, so the
// record is serialised to bytes and written to the exact path.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{anyhow, Context, Result};
use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::runner::RunnerConfig;

type WeightsRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Weights and config files for one experiment.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn config_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }

    /// Overwrite the checkpoint with the current weights.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<()> {
        self.ensure_dir()?;

        let bytes = Recorder::<B>::record(&WeightsRecorder::default(), model.clone().into_record(), ())
            .map_err(|e| anyhow!("Failed to serialise weights: {e:?}"))?;

        fs::write(&self.path, bytes)
            .with_context(|| format!("Failed to save checkpoint to '{}'", self.path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", self.path.display());
        Ok(())
    }

    /// Load saved weights into `model`, which must have the same architecture.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Cannot read checkpoint '{}'", self.path.display()))?;

        let record: M::Record = Recorder::<B>::load(&WeightsRecorder::default(), bytes, device)
            .map_err(|e| anyhow!(
                "Cannot load checkpoint '{}' (architecture mismatch?): {e:?}",
                self.path.display()
            ))?;

        tracing::info!("Restored weights from '{}'", self.path.display());
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &RunnerConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.config_path();
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    /// The config saved by a previous run, if any.
    pub fn load_config(&self) -> Result<Option<RunnerConfig>> {
        let path = self.config_path();
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::VaeConfig;
    use burn::backend::NdArray;

    type TB = NdArray;

    /// Deterministic fingerprint of a model's weights: decoder output on a fixed latent
    fn fingerprint(m: &crate::ml::model::VanillaVae<TB>) -> Vec<f32> {
        let z = Tensor::<TB, 2>::ones([1, 2], &Default::default());
        m.decoder.forward(z).into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_weights_round_trip_at_exact_path() {
        let tmp   = tempfile::tempdir().unwrap();
        let path  = tmp.path().join("checkpoints/MNIST_VANILLA_SG_3.cpkt");
        let store = CheckpointStore::new(&path);
        let device = Default::default();
        let cfg   = VaeConfig::new(6).with_hidden_dim(4).with_latent_dim(2);

        let trained = cfg.init_vanilla::<TB>(None, &device);
        store.save_model::<TB, _>(&trained).unwrap();
        assert!(path.is_file());

        // a freshly initialised model has different weights until loaded
        let fresh    = cfg.init_vanilla::<TB>(None, &device);
        assert_ne!(fingerprint(&fresh), fingerprint(&trained));
        let restored = store.load_model::<TB, _>(fresh, &device).unwrap();
        assert_eq!(fingerprint(&restored), fingerprint(&trained));
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path().join("nope.cpkt"));
        let model = VaeConfig::new(4).init_vanilla::<TB>(None, &Default::default());
        assert!(store.load_model::<TB, _>(model, &Default::default()).is_err());
    }

    #[test]
    fn test_config_sits_beside_checkpoint() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path().join("c/X.cpkt"));
        assert!(store.load_config().unwrap().is_none());

        let cfg = RunnerConfig { hidden_dim: 17, ..RunnerConfig::default() };
        store.save_config(&cfg).unwrap();
        assert!(tmp.path().join("c/X.json").is_file());
        assert_eq!(store.load_config().unwrap().unwrap().hidden_dim, 17);
    }
}
