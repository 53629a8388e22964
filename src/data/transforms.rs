// ============================================================
// Layer 4 — Image Transforms
// ============================================================
// Turns an image file into the 3×56×56 normalised CHW vector the
// CNN branch consumes, and provides the random geometric transforms
// used by augmentation.
//
// Base pipeline:
//   decode → RGB → resize 56×56 → /255 → (x - mean) / std → CHW
//
// Augmentation pipeline (one crop op and one flip op chosen per sample):
//   decode → RGB → resize 56×56 → crop op → flip op → /255 → normalise → CHW

use std::path::Path;

use image::{
    imageops::{self, FilterType},
    RgbImage,
};
use rand::Rng;

use crate::data::error::{DatasetError, DatasetResult};
use crate::domain::sample::{IMAGE_CHANNELS, IMAGE_SIZE};

pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD:  [f32; 3] = [0.229, 0.224, 0.225];

const SIZE: u32 = IMAGE_SIZE as u32;

// Bounds used by the random-resized-crop.
const CROP_SCALE: (f64, f64) = (0.08, 1.0);
const CROP_RATIO: (f64, f64) = (3.0 / 4.0, 4.0 / 3.0);
const CROP_ATTEMPTS: usize = 10;

/// Decode any supported image format into RGB.
pub fn load_rgb(path: &Path) -> DatasetResult<RgbImage> {
    let img = image::open(path).map_err(|source| DatasetError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

pub fn resize(img: &RgbImage) -> RgbImage {
    imageops::resize(img, SIZE, SIZE, FilterType::Triangle)
}

/// Base pipeline on an already decoded image.
pub fn to_tensor(img: &RgbImage) -> Vec<f32> {
    normalize_chw(&resize(img))
}

/// Scale to [0, 1], normalise per channel, lay out as CHW.
pub fn normalize_chw(img: &RgbImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let plane = (w * h) as usize;
    let mut chw = vec![0.0f32; IMAGE_CHANNELS * plane];

    for (x, y, pixel) in img.enumerate_pixels() {
        let base = (y * w + x) as usize;
        for c in 0..IMAGE_CHANNELS {
            let v = pixel[c] as f32 / 255.0;
            chw[c * plane + base] = (v - MEAN[c]) / STD[c];
        }
    }
    chw
}

/// Inverse of `normalize_chw` for a square `size`×`size` image.
pub fn denormalize_chw(chw: &[f32], size: u32) -> RgbImage {
    let plane = (size * size) as usize;
    RgbImage::from_fn(size, size, |x, y| {
        let base = (y * size + x) as usize;
        let mut px = [0u8; 3];
        for c in 0..IMAGE_CHANNELS {
            let v = chw.get(c * plane + base).copied().unwrap_or(0.0) * STD[c] + MEAN[c];
            px[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        image::Rgb(px)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropOp {
    RandomResizedCrop,
    RandomCrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOp {
    RandomHorizontal,
    RandomVertical,
}

/// The pair of random transforms applied to one augmented image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AugmentPlan {
    pub crop: CropOp,
    pub flip: FlipOp,
}

impl AugmentPlan {
    /// Each op is picked with probability 0.5.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let crop = if rng.gen_bool(0.5) { CropOp::RandomResizedCrop } else { CropOp::RandomCrop };
        let flip = if rng.gen_bool(0.5) { FlipOp::RandomHorizontal } else { FlipOp::RandomVertical };
        Self { crop, flip }
    }

    /// Run the augmentation pipeline and return the normalised CHW vector.
    pub fn apply<R: Rng + ?Sized>(&self, img: &RgbImage, rng: &mut R) -> Vec<f32> {
        let resized = resize(img);

        let cropped = match self.crop {
            CropOp::RandomResizedCrop => random_resized_crop(&resized, rng),
            CropOp::RandomCrop        => random_crop(&resized, rng),
        };

        // Both flips fire with probability 0.5 once selected.
        let flipped = match self.flip {
            FlipOp::RandomHorizontal if rng.gen_bool(0.5) => imageops::flip_horizontal(&cropped),
            FlipOp::RandomVertical if rng.gen_bool(0.5)   => imageops::flip_vertical(&cropped),
            _ => cropped,
        };

        normalize_chw(&flipped)
    }
}

/// Crop a random area/aspect-ratio window and resize it to 56×56.
pub fn random_resized_crop<R: Rng + ?Sized>(img: &RgbImage, rng: &mut R) -> RgbImage {
    let (w, h) = img.dimensions();
    let area = (w * h) as f64;

    for _ in 0..CROP_ATTEMPTS {
        let target_area = area * rng.gen_range(CROP_SCALE.0..=CROP_SCALE.1);
        let log_ratio = rng.gen_range(CROP_RATIO.0.ln()..=CROP_RATIO.1.ln());
        let ratio = log_ratio.exp();

        let cw = (target_area * ratio).sqrt().round() as u32;
        let ch = (target_area / ratio).sqrt().round() as u32;

        if cw > 0 && ch > 0 && cw <= w && ch <= h {
            let x = rng.gen_range(0..=w - cw);
            let y = rng.gen_range(0..=h - ch);
            let window = imageops::crop_imm(img, x, y, cw, ch).to_image();
            return imageops::resize(&window, SIZE, SIZE, FilterType::Triangle);
        }
    }

    // Fallback: the whole image.
    imageops::resize(img, SIZE, SIZE, FilterType::Triangle)
}

/// Crop a random 56×56 window; identity on an image that is already 56×56.
pub fn random_crop<R: Rng + ?Sized>(img: &RgbImage, rng: &mut R) -> RgbImage {
    let (w, h) = img.dimensions();
    if w < SIZE || h < SIZE {
        return resize(img);
    }
    let x = rng.gen_range(0..=w - SIZE);
    let y = rng.gen_range(0..=h - SIZE);
    imageops::crop_imm(img, x, y, SIZE, SIZE).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::IMAGE_LEN;
    use rand::{rngs::StdRng, SeedableRng};

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| image::Rgb([(x * 3) as u8, (y * 2) as u8, 128]))
    }

    #[test]
    fn test_base_pipeline_shape() {
        let chw = to_tensor(&gradient(120, 80));
        assert_eq!(chw.len(), IMAGE_LEN);
        assert!(chw.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_normalization_uses_channel_stats() {
        let img = RgbImage::from_pixel(SIZE, SIZE, image::Rgb([255, 0, 0]));
        let chw = normalize_chw(&img);
        let plane = IMAGE_SIZE * IMAGE_SIZE;
        assert!((chw[0] - (1.0 - MEAN[0]) / STD[0]).abs() < 1e-5);
        assert!((chw[plane] - (0.0 - MEAN[1]) / STD[1]).abs() < 1e-5);
    }

    #[test]
    fn test_denormalize_restores_pixels() {
        let img = gradient(SIZE, SIZE);
        let back = denormalize_chw(&normalize_chw(&img), SIZE);
        assert_eq!(back.get_pixel(10, 20), img.get_pixel(10, 20));
    }

    #[test]
    fn test_random_crop_on_target_size_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let img = gradient(SIZE, SIZE);
        assert_eq!(random_crop(&img, &mut rng), img);
    }

    #[test]
    fn test_augmented_output_keeps_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let img = gradient(200, 90);
        for _ in 0..8 {
            let plan = AugmentPlan::random(&mut rng);
            assert_eq!(plan.apply(&img, &mut rng).len(), IMAGE_LEN);
        }
    }

    #[test]
    fn test_load_rgb_reports_path_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img_0000001.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        let err = load_rgb(&path).unwrap_err();
        assert!(matches!(err, DatasetError::ImageDecode { .. }));
        assert!(err.to_string().contains("img_0000001.jpg"));
    }
}
