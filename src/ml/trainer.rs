// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam,
// generic over both architectures.
//
//   - Training uses the autodiff backend B for gradients
//   - model.valid() returns the model on B::InnerBackend,
//     so validation batches are built on the inner backend
//   - After every epoch:
//       (a) one row is appended to the history log
//       (b) the checkpoint is overwritten if val_loss improved
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::ImageBatcher,
    dataset::{DatasetPair, ImageDataset},
};
use crate::infra::{
    checkpoint::CheckpointStore,
    history::{HistoryLog, HistoryRecord},
};
use crate::ml::{evaluator::evaluate, model::ElboModel};

/// Knobs for one call to [`fit`].
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Epochs to run in this call
    pub epochs:        usize,
    /// Index given to the first epoch of this call
    pub initial_epoch: usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    pub shuffle_seed:  u64,
    /// Best val_loss seen by earlier runs (+∞ for a fresh run)
    pub best_val_loss: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub epochs_run:    usize,
    pub best_val_loss: f64,
    pub last:          Option<HistoryRecord>,
}

pub fn fit<B, M>(
    mut model: M,
    data:      &DatasetPair,
    opts:      &FitOptions,
    history:   &HistoryLog,
    ckpt:      &CheckpointStore,
    device:    &B::Device,
) -> Result<(M, FitSummary)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ElboModel<B>,
    M::InnerModule: ElboModel<B::InnerBackend>,
{
    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().init();

    // ── Training data loader (autodiff backend) ───────────────────────────────
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(opts.batch_size)
        .shuffle(opts.shuffle_seed)
        .num_workers(1)
        .build(ImageDataset::new(data.train.clone()));

    let mut best = opts.best_val_loss;
    let mut last = None;

    for i in 0..opts.epochs {
        let epoch = opts.initial_epoch + i;

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut examples = 0usize;

        for batch in train_loader.iter() {
            let n     = batch.images.dims()[0];
            let terms = model.elbo(batch.images);
            loss_sum += terms.loss.clone().into_scalar().elem::<f64>() * n as f64;
            examples += n;

            let grads = terms.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(opts.learning_rate, model, grads);
        }

        // example-weighted, like the validation loss
        let train_loss = if examples > 0 { loss_sum / examples as f64 } else { f64::NAN };

        // ── Validation phase (inner backend, no autodiff) ─────────────────────
        let report = evaluate::<B::InnerBackend, _>(&model.valid(), data.test.clone(), opts.batch_size, device);

        let record = HistoryRecord::new(epoch, train_loss, report.loss);
        tracing::info!(
            "Epoch {:>4} ({}/{}) | loss={:.4} | val_loss={:.4} | val_rec={:.4} | val_kl={:.4}",
            epoch, i + 1, opts.epochs, train_loss, report.loss, report.reconstruction, report.kl,
        );

        history.append(&record)?;

        if record.is_improvement(best) {
            tracing::info!("val_loss improved from {:.4} to {:.4}; saving checkpoint", best, record.val_loss);
            best = record.val_loss;
            ckpt.save_model::<B, M>(&model)?;
        }

        last = Some(record);
    }

    Ok((model, FitSummary { epochs_run: opts.epochs, best_val_loss: best, last }))
}
