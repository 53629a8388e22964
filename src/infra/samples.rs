// ============================================================
// Layer 6 — Prediction Image Dumps
// ============================================================
// Saves a handful of evaluation images, denormalised back to RGB,
// so a person can eyeball what the model got right or wrong.
//
//   <dir>/tick_<n>/<i>_true-<Class>_pred-<Class>.png

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::data::transforms::denormalize_chw;
use crate::domain::class::MemeClass;
use crate::domain::sample::{IMAGE_LEN, IMAGE_SIZE};

fn slug(class: MemeClass) -> String {
    class.name().replace(' ', "")
}

/// `images` is a flat batch of normalised CHW images.
/// Returns the written paths, at most `limit` of them.
pub fn dump_predictions(
    dir:         &Path,
    tick:        usize,
    images:      &[f32],
    labels:      &[usize],
    predictions: &[usize],
    limit:       usize,
) -> Result<Vec<PathBuf>> {
    let out_dir = dir.join(format!("tick_{tick}"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Cannot create '{}'", out_dir.display()))?;

    let mut written = Vec::new();
    let rows = images.chunks_exact(IMAGE_LEN).zip(labels).zip(predictions).take(limit);

    for (i, ((chw, &truth), &pred)) in rows.enumerate() {
        let (Some(truth), Some(pred)) = (MemeClass::from_index(truth), MemeClass::from_index(pred)) else {
            continue;
        };
        let path = out_dir.join(format!("{i:03}_true-{}_pred-{}.png", slug(truth), slug(pred)));
        denormalize_chw(chw, IMAGE_SIZE as u32)
            .save(&path)
            .with_context(|| format!("Cannot save '{}'", path.display()))?;
        written.push(path);
    }

    tracing::debug!("Dumped {} evaluation images to '{}'", written.len(), out_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_carry_true_and_predicted_class() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![0.0f32; IMAGE_LEN * 3];

        let paths = dump_predictions(dir.path(), 2, &images, &[0, 1, 2], &[0, 2, 2], 2).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("tick_2/001_true-NoMeme_pred-Sticker.png"));
        assert!(paths.iter().all(|p| p.exists()));
    }
}
