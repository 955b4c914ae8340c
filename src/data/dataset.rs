use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use std::sync::Arc;

/// A set of same-shaped images stored row-major as `f32` in [0, 1].
///
/// `dims` is the per-example shape (e.g. `[28, 28]`); every model in
/// this crate sees examples flattened to `prod(dims)` values.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSet {
    dims:   Vec<usize>,
    pixels: Vec<f32>,
}

impl ImageSet {
    pub fn new(dims: Vec<usize>, pixels: Vec<f32>) -> Result<Self> {
        let width: usize = dims.iter().product();
        if width == 0 {
            bail!("image dims {:?} describe an empty example", dims);
        }
        if pixels.len() % width != 0 {
            bail!(
                "{} pixels do not divide into examples of shape {:?}",
                pixels.len(), dims,
            );
        }
        Ok(Self { dims, pixels })
    }

    /// Per-example shape, without the batch dimension
    pub fn dims(&self) -> &[usize] { &self.dims }

    /// Flattened example width
    pub fn input_dim(&self) -> usize { self.dims.iter().product() }

    pub fn len(&self) -> usize { self.pixels.len() / self.input_dim() }

    pub fn is_empty(&self) -> bool { self.pixels.is_empty() }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let w = self.input_dim();
        self.pixels.get(index * w..(index + 1) * w)
    }

    /// The first `n` examples (or all of them, if fewer), row-major
    pub fn head(&self, n: usize) -> &[f32] {
        let rows = n.min(self.len());
        &self.pixels[..rows * self.input_dim()]
    }
}

/// The (train, test) split returned by a dataset source.
#[derive(Debug, Clone)]
pub struct DatasetPair {
    pub train: Arc<ImageSet>,
    pub test:  Arc<ImageSet>,
}

impl DatasetPair {
    pub fn new(train: ImageSet, test: ImageSet) -> Result<Self> {
        if train.dims() != test.dims() {
            bail!("train dims {:?} differ from test dims {:?}", train.dims(), test.dims());
        }
        if train.is_empty() || test.is_empty() {
            bail!("dataset split is empty (train={}, test={})", train.len(), test.len());
        }
        Ok(Self { train: Arc::new(train), test: Arc::new(test) })
    }
}

// ─── Burn Dataset ─────────────────────────────────────────────────────────────

/// One flattened example handed to the batcher.
#[derive(Debug, Clone)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
}

/// Burn view over a shared image set.
pub struct ImageDataset {
    set: Arc<ImageSet>,
}

impl ImageDataset {
    pub fn new(set: Arc<ImageSet>) -> Self { Self { set } }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.set.row(index).map(|p| ImageItem { pixels: p.to_vec() })
    }

    fn len(&self) -> usize {
        self.set.len()
    }
}
