// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Produces the (train, test) split for each dataset key.
//
//   MNIST    → burn's built-in MnistDataset (downloaded on first use)
//   OMNIGLOT → image folder  {data_dir}/omniglot/{train,test}/**
//   CALTECH  → image folder  {data_dir}/caltech/{train,test}/**
//
// Folder images are decoded with the `image` crate, converted
// to 8-bit luma, resized to 28×28 and divided by 255, so all
// three datasets reach the models in the same [0, 1] range.
//
// Reference: Burn Book §4 (Datasets)
//            image crate documentation

use anyhow::{bail, Context, Result};
use burn::data::dataset::{
    vision::MnistDataset,
    Dataset,
};
use image::imageops::FilterType;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::dataset::{DatasetPair, ImageSet};
use crate::domain::experiment::DatasetKey;
use crate::domain::traits::DatasetSource;

/// Side length every folder image is resized to
pub const IMAGE_SIDE: u32 = 28;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Loads datasets from burn's vision module or from image folders.
pub struct VisionSource {
    /// Root holding the `omniglot/` and `caltech/` folders
    data_dir: PathBuf,
}

impl VisionSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    fn folder_split(&self, name: &str) -> Result<DatasetPair> {
        let root  = self.data_dir.join(name);
        let train = load_image_folder(&root.join("train"))?;
        let test  = load_image_folder(&root.join("test"))?;
        DatasetPair::new(train, test)
    }
}

impl DatasetSource for VisionSource {
    fn load(&self, key: DatasetKey) -> Result<DatasetPair> {
        tracing::info!("Fetching dataset {}", key);
        let pair = match key {
            DatasetKey::Mnist    => DatasetPair::new(mnist_split(MnistDataset::train())?,
                                                     mnist_split(MnistDataset::test())?)?,
            DatasetKey::Omniglot => self.folder_split("omniglot")?,
            DatasetKey::Caltech  => self.folder_split("caltech")?,
        };
        tracing::info!(
            "Loaded {}: {} train / {} test examples of shape {:?}",
            key, pair.train.len(), pair.test.len(), pair.train.dims(),
        );
        Ok(pair)
    }
}

/// Flatten burn's MNIST items into an ImageSet scaled to [0, 1]
fn mnist_split(ds: MnistDataset) -> Result<ImageSet> {
    let mut pixels = Vec::with_capacity(ds.len() * 28 * 28);
    for item in ds.iter() {
        for row in item.image.iter() {
            pixels.extend(row.iter().map(|p| p / 255.0));
        }
    }
    ImageSet::new(vec![28, 28], pixels)
}

/// Load every image under `dir` (recursively, sorted by path).
pub fn load_image_folder(dir: &Path) -> Result<ImageSet> {
    if !dir.is_dir() {
        bail!("image folder '{}' does not exist", dir.display());
    }

    let mut files = Vec::new();
    collect_images(dir, &mut files)?;
    files.sort();

    if files.is_empty() {
        bail!("image folder '{}' contains no images", dir.display());
    }

    let side   = IMAGE_SIDE as usize;
    let mut pixels = Vec::with_capacity(files.len() * side * side);
    for path in &files {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?
            .to_luma8();
        let img = image::imageops::resize(&img, IMAGE_SIDE, IMAGE_SIDE, FilterType::Triangle);
        pixels.extend(img.as_raw().iter().map(|&p| p as f32 / 255.0));
    }

    tracing::debug!("Read {} images from '{}'", files.len(), dir.display());
    ImageSet::new(vec![side, side], pixels)
}

fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_images(&path, out)?;
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            out.push(path);
        }
    }
    Ok(())
}
