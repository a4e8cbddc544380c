// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Dataset clean-up and selection tools.

use super::types::{CocoDataset, CocoIndex};
use crate::{
    Error,
    mining::BoxFormat,
    store::{ImageStore, Overlay},
};
use log::{info, warn};
use std::{
    collections::{BTreeSet, HashSet},
    path::{Path, PathBuf},
};

/// `<dir>/<stem><suffix>.json` next to `input`.
pub fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}.json", stem, suffix))
}

/// Split a dataset into images with annotations and images without.
///
/// Returns `(kept, empty)`. Image and annotation ids are unchanged and the
/// empty dataset has no annotations.
pub fn remove_empty(dataset: &CocoDataset) -> (CocoDataset, CocoDataset) {
    let annotated: HashSet<u64> = dataset.annotations.iter().map(|a| a.image_id).collect();
    let (kept, empty): (Vec<_>, Vec<_>) = dataset
        .images
        .iter()
        .cloned()
        .partition(|img| annotated.contains(&img.id));

    info!(
        "{} images with annotations, {} without",
        kept.len(),
        empty.len()
    );
    (
        dataset.with_content(kept, dataset.annotations.clone()),
        dataset.with_content(empty, Vec::new()),
    )
}

/// Drop images that are missing below `image_dir` or fail to decode, along
/// with their annotations.
///
/// Returns the cleaned dataset and the paths that failed verification.
pub fn remove_missing(
    dataset: &CocoDataset,
    image_dir: &Path,
    store: &dyn ImageStore,
) -> (CocoDataset, Vec<PathBuf>) {
    let mut removed = Vec::new();
    let mut removed_ids = HashSet::new();
    let mut images = Vec::with_capacity(dataset.images.len());

    for img in &dataset.images {
        let path = image_dir.join(&img.file_name);
        match store.verify(&path) {
            Ok(()) => images.push(img.clone()),
            Err(err) => {
                warn!("Removing image {}: {}", img.id, err);
                removed_ids.insert(img.id);
                removed.push(path);
            }
        }
    }

    let annotations = dataset
        .annotations
        .iter()
        .filter(|a| !removed_ids.contains(&a.image_id))
        .cloned()
        .collect();

    info!(
        "Kept {} images, removed {}",
        images.len(),
        removed.len()
    );
    (dataset.with_content(images, annotations), removed)
}

/// Drop images of `dataset` whose `file_name` also appears in `exclusion`,
/// along with their annotations.
///
/// Images are kept by id: an id is dropped only when none of its image
/// entries survives the file-name check.
pub fn exclude_images(dataset: &CocoDataset, exclusion: &CocoDataset) -> CocoDataset {
    let excluded: HashSet<&str> = exclusion
        .images
        .iter()
        .map(|img| img.file_name.as_str())
        .collect();
    info!("{} file names to exclude", excluded.len());

    let kept_ids: HashSet<u64> = dataset
        .images
        .iter()
        .filter(|img| !excluded.contains(img.file_name.as_str()))
        .map(|img| img.id)
        .collect();

    let images: Vec<_> = dataset
        .images
        .iter()
        .filter(|img| kept_ids.contains(&img.id))
        .cloned()
        .collect();
    let annotations: Vec<_> = dataset
        .annotations
        .iter()
        .filter(|a| kept_ids.contains(&a.image_id))
        .cloned()
        .collect();

    info!(
        "Keeping {} / {} images and {} / {} annotations",
        images.len(),
        dataset.images.len(),
        annotations.len(),
        dataset.annotations.len()
    );
    dataset.with_content(images, annotations)
}

/// Inclusive score bounds for [`select_by_score`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    min: Option<f64>,
    max: Option<f64>,
}

impl ScoreRange {
    /// At least one bound is required, and `min` must not exceed `max`.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, Error> {
        match (min, max) {
            (None, None) => Err(Error::InvalidParameters(
                "at least one of min score or max score is required".to_string(),
            )),
            (Some(lo), Some(hi)) if lo > hi => Err(Error::InvalidParameters(format!(
                "min score {} exceeds max score {}",
                lo, hi
            ))),
            _ => Ok(Self { min, max }),
        }
    }

    pub fn contains(&self, score: f64) -> bool {
        self.min.is_none_or(|lo| score >= lo) && self.max.is_none_or(|hi| score <= hi)
    }
}

/// Ids of images with at least one annotation scoring inside `range`.
///
/// Annotations without a score count as `1.0`.
pub fn select_by_score(dataset: &CocoDataset, range: &ScoreRange) -> BTreeSet<u64> {
    dataset
        .annotations
        .iter()
        .filter(|a| range.contains(a.score_or(1.0)))
        .map(|a| a.image_id)
        .collect()
}

/// Counts from [`export_images`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub selected: usize,
    pub written: usize,
    pub failed: usize,
}

/// Write the images in `image_ids` from `img_root` to `out_dir`, keeping
/// their relative `file_name`.
///
/// With `draw` set, every annotation of the image is drawn as a prediction
/// box; otherwise the file is copied. Ids without an image entry and files
/// that fail are logged and counted.
pub fn export_images(
    dataset: &CocoDataset,
    image_ids: &BTreeSet<u64>,
    img_root: &Path,
    out_dir: &Path,
    store: &dyn ImageStore,
    draw: Option<BoxFormat>,
) -> ExportSummary {
    let index = CocoIndex::from_dataset(dataset);
    let mut summary = ExportSummary {
        selected: image_ids.len(),
        ..Default::default()
    };

    for image_id in image_ids {
        let Some(image) = index.images.get(image_id) else {
            warn!("Image {} has annotations but no image entry", image_id);
            summary.failed += 1;
            continue;
        };

        let src = img_root.join(&image.file_name);
        let dst = out_dir.join(&image.file_name);
        let result = match draw {
            Some(format) => {
                let overlay =
                    Overlay::from_annotations(&[], index.annotations_for_image(*image_id), format);
                store.visualize(&src, &dst, &overlay)
            }
            None => store.copy(&src, &dst),
        };

        match result {
            Ok(()) => summary.written += 1,
            Err(err) => {
                warn!("Skipping {}: {}", src.display(), err);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Selected {} images, wrote {}, {} failed",
        summary.selected, summary.written, summary.failed
    );
    summary
}
