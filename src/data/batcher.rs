// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack flattened images
// into one [batch_size, input_dim] tensor.
//
//   [img1_p1, ..., img1_pD, img2_p1, ..., imgN_pD] → [N, D]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageItem;

/// A batch of images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Flattened pixels — shape: [batch_size, input_dim]
    pub images: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let batch_size = items.len();
        let input_dim  = items.first().map(|i| i.pixels.len()).unwrap_or(0);

        let flat: Vec<f32> = items
            .into_iter()
            .flat_map(|i| i.pixels)
            .collect();

        let images = Tensor::<B, 2>::from_data(
            TensorData::new(flat, [batch_size, input_dim]),
            &self.device,
        );

        ImageBatch { images }
    }
}
