// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a model over a whole split without gradients and
// averages the ELBO terms, weighting each batch by its size.
// Used for the per-epoch validation loss and by `inspect`.

use burn::{
    data::dataloader::DataLoaderBuilder,
    prelude::*,
};
use std::sync::Arc;

use crate::data::{
    batcher::ImageBatcher,
    dataset::{ImageDataset, ImageSet},
};
use crate::ml::model::ElboModel;

/// Example-weighted means over one split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub loss:           f64,
    pub reconstruction: f64,
    pub kl:             f64,
    pub examples:       usize,
}

pub fn evaluate<B: Backend, M: ElboModel<B>>(
    model:      &M,
    set:        Arc<ImageSet>,
    batch_size: usize,
    device:     &B::Device,
) -> EvalReport {
    let loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .num_workers(1)
        .build(ImageDataset::new(set));

    let (mut loss, mut rec, mut kl) = (0.0f64, 0.0f64, 0.0f64);
    let mut examples = 0usize;

    for batch in loader.iter() {
        let n = batch.images.dims()[0];
        let terms = model.elbo(batch.images);
        loss += terms.loss.into_scalar().elem::<f64>() * n as f64;
        rec  += terms.reconstruction.into_scalar().elem::<f64>() * n as f64;
        kl   += terms.kl.into_scalar().elem::<f64>() * n as f64;
        examples += n;
    }

    if examples == 0 {
        return EvalReport { loss: f64::NAN, reconstruction: f64::NAN, kl: f64::NAN, examples };
    }

    let n = examples as f64;
    EvalReport { loss: loss / n, reconstruction: rec / n, kl: kl / n, examples }
}
