// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-category evidence output.
//!
//! For every error category the materializer produces:
//!
//! ```text
//! <output>/<category>/raw/<basename>      source image copy
//! <output>/<category>/vis/<basename>      image with GT (green) and predictions (red)
//! <output>/cocojson/<category>.gt.json    ground truth for the implicated images
//! <output>/cocojson/<category>.pred.json  predictions for the implicated images
//! ```
//!
//! Image failures are logged and skipped; only a failure to write one of the
//! JSON files aborts the run.

use super::{
    classifier::{ErrorCategory, HardExamples},
    geometry::BoxFormat,
};
use crate::{
    Error,
    coco::{CocoDataset, CocoIndex, CocoWriter},
    store::{ImageStore, Overlay},
};
use log::{debug, info, warn};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

/// Directory under the output root holding the per-category JSON files.
pub const JSON_DIR: &str = "cocojson";

/// Progress of a materialization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Images processed so far, across all categories.
    pub current: usize,
    /// Images to process, across all categories.
    pub total: usize,
}

/// Counts for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryOutcome {
    pub category: ErrorCategory,
    /// Distinct images implicated by the category's records.
    pub images: usize,
    /// Images whose id has no entry in the ground-truth image list.
    pub unresolved: usize,
    /// Raw copies written.
    pub copied: usize,
    /// Visualizations written.
    pub visualized: usize,
}

/// Counts for a whole run, one entry per category in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    pub categories: Vec<CategoryOutcome>,
}

impl MaterializeSummary {
    pub fn get(&self, category: ErrorCategory) -> Option<&CategoryOutcome> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn total_copied(&self) -> usize {
        self.categories.iter().map(|c| c.copied).sum()
    }

    pub fn total_visualized(&self) -> usize {
        self.categories.iter().map(|c| c.visualized).sum()
    }
}

/// Writes the evidence for [`HardExamples`] through an [`ImageStore`].
pub struct Materializer<'s> {
    store: &'s dyn ImageStore,
    writer: CocoWriter,
    images_dir: PathBuf,
    output_dir: PathBuf,
    format: BoxFormat,
}

impl<'s> Materializer<'s> {
    /// Create a materializer reading source images below `images_dir` and
    /// writing below `output_dir`.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        store: &'s dyn ImageStore,
        images_dir: P,
        output_dir: Q,
    ) -> Self {
        Self {
            store,
            writer: CocoWriter::new(),
            images_dir: images_dir.into(),
            output_dir: output_dir.into(),
            format: BoxFormat::default(),
        }
    }

    /// Box format used when drawing overlays.
    pub fn with_format(mut self, format: BoxFormat) -> Self {
        self.format = format;
        self
    }

    /// Path of the JSON file for `category`; `suffix` is `gt` or `pred`.
    pub fn json_path(&self, category: ErrorCategory, suffix: &str) -> PathBuf {
        self.output_dir
            .join(JSON_DIR)
            .join(format!("{}.{}.json", category.key(), suffix))
    }

    /// Materialize every category of `examples`.
    ///
    /// Records should already be capped; every record's image is written.
    /// Existing files are overwritten.
    pub fn materialize(
        &self,
        gt: &CocoDataset,
        pred: &CocoDataset,
        examples: &HardExamples<'_>,
        mut progress: Option<&mut dyn FnMut(Progress)>,
    ) -> Result<MaterializeSummary, Error> {
        let gt_index = CocoIndex::from_dataset(gt);
        let pred_index = CocoIndex::from_dataset(pred);

        let plan: Vec<(ErrorCategory, BTreeSet<u64>)> = ErrorCategory::ALL
            .into_iter()
            .map(|c| (c, examples.image_ids(c)))
            .collect();
        let total = plan.iter().map(|(_, ids)| ids.len()).sum();
        let mut current = 0;

        let mut summary = MaterializeSummary::default();
        for (category, image_ids) in plan {
            let category_dir = self.output_dir.join(category.key());
            let mut outcome = CategoryOutcome {
                category,
                images: image_ids.len(),
                unresolved: 0,
                copied: 0,
                visualized: 0,
            };

            for &image_id in &image_ids {
                current += 1;
                let Some(image) = gt_index.images.get(&image_id) else {
                    warn!(
                        "{}: image {} not found in ground-truth images, skipping",
                        category, image_id
                    );
                    outcome.unresolved += 1;
                    report(&mut progress, current, total);
                    continue;
                };

                let src = self.images_dir.join(&image.file_name);
                let basename = image.basename();

                let raw = category_dir.join("raw").join(basename);
                match self.store.copy(&src, &raw) {
                    Ok(()) => outcome.copied += 1,
                    Err(err) => warn!("Failed to copy {}: {}", src.display(), err),
                }

                let overlay = Overlay::from_annotations(
                    gt_index.annotations_for_image(image_id),
                    pred_index.annotations_for_image(image_id),
                    self.format,
                );
                let vis = category_dir.join("vis").join(basename);
                match self.store.visualize(&src, &vis, &overlay) {
                    Ok(()) => outcome.visualized += 1,
                    Err(err) => warn!("Failed to visualize {}: {}", src.display(), err),
                }

                report(&mut progress, current, total);
            }

            self.write_subset(gt, category, &image_ids, &self.json_path(category, "gt"))?;
            self.write_subset(pred, category, &image_ids, &self.json_path(category, "pred"))?;

            info!(
                "{}: {} images, {} copied, {} visualized, {} unresolved",
                category, outcome.images, outcome.copied, outcome.visualized, outcome.unresolved
            );
            summary.categories.push(outcome);
        }

        Ok(summary)
    }

    /// Write the part of `dataset` covering `image_ids`, with file names
    /// pointing at the category's raw copies.
    fn write_subset(
        &self,
        dataset: &CocoDataset,
        category: ErrorCategory,
        image_ids: &BTreeSet<u64>,
        path: &Path,
    ) -> Result<(), Error> {
        let images = dataset
            .images
            .iter()
            .filter(|img| image_ids.contains(&img.id))
            .map(|img| {
                let mut img = img.clone();
                img.file_name = format!("{}/raw/{}", category.key(), img.basename());
                img
            })
            .collect::<Vec<_>>();
        let annotations = dataset
            .annotations
            .iter()
            .filter(|ann| image_ids.contains(&ann.image_id))
            .cloned()
            .collect::<Vec<_>>();

        debug!(
            "Writing {} ({} images, {} annotations)",
            path.display(),
            images.len(),
            annotations.len()
        );
        self.writer
            .write_json(&dataset.with_content(images, annotations), path)
    }
}

fn report(progress: &mut Option<&mut dyn FnMut(Progress)>, current: usize, total: usize) {
    if let Some(callback) = progress.as_mut() {
        callback(Progress { current, total });
    }
}
