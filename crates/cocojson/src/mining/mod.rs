// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # Hard-example mining
//!
//! Compares a ground-truth COCO set against a model's predictions, matches
//! boxes image by image, and sorts the mismatches into four error
//! categories (see [`ErrorCategory`]). The result can be summarised with
//! [`Report`] and written out as per-category evidence with
//! [`Materializer`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use cocojson::coco::CocoReader;
//! use cocojson::mining::{BoxFormat, Materializer, Report, Thresholds, analyze};
//! use cocojson::store::FsImageStore;
//!
//! # fn main() -> Result<(), cocojson::Error> {
//! let reader = CocoReader::new();
//! let gt = reader.read_json("val/instances.json")?;
//! let pred = reader.read_json("val/predictions.json")?;
//!
//! let mut analysis = analyze(&gt, &pred, &Thresholds::default(), BoxFormat::Xywh)?;
//! println!("{}", Report::from_analysis(&analysis, &gt));
//!
//! analysis.examples.truncate(1000);
//! let store = FsImageStore::new();
//! let summary = Materializer::new(&store, "val/images", "hard_examples")
//!     .materialize(&gt, &pred, &analysis.examples, None)?;
//! println!("{} images copied", summary.total_copied());
//! # Ok(())
//! # }
//! ```

pub mod geometry;

mod classifier;
mod materialize;
mod matcher;
mod report;

pub use classifier::{ErrorCategory, ErrorRecord, HardExamples, Thresholds};
pub use geometry::{BoxFormat, BoxXyxy, bbox_iou, iou, to_xyxy};
pub use materialize::{CategoryOutcome, MaterializeSummary, Materializer, Progress};
pub use matcher::{ImageMatch, MatchedPair, match_image};
pub use report::{CategorySummary, Report};

use crate::{
    Error,
    coco::{CocoDataset, CocoIndex},
};
use itertools::Itertools;

/// Bookkeeping counts from one analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    /// Distinct images with at least one ground-truth annotation.
    pub gt_images: usize,
    /// Distinct images with at least one prediction.
    pub pred_images: usize,
    /// Images with annotations on either side.
    pub evaluated_images: usize,
    /// Matched ground-truth/prediction pairs across all images.
    pub matched_pairs: usize,
}

/// Outcome of [`analyze`].
#[derive(Debug, Clone)]
pub struct Analysis<'a> {
    pub thresholds: Thresholds,
    pub format: BoxFormat,
    pub stats: AnalysisStats,
    pub examples: HardExamples<'a>,
}

/// Match and classify every image that has annotations in either set.
///
/// Images are visited in ascending id order, which fixes the order of the
/// records inside each category. Fails with [`Error::InvalidParameters`]
/// when the thresholds are out of range.
pub fn analyze<'a>(
    gt: &'a CocoDataset,
    pred: &'a CocoDataset,
    thresholds: &Thresholds,
    format: BoxFormat,
) -> Result<Analysis<'a>, Error> {
    thresholds.validate()?;

    let gt_index = CocoIndex::from_dataset(gt);
    let pred_index = CocoIndex::from_dataset(pred);

    let image_ids: Vec<u64> = gt_index
        .annotations_by_image
        .keys()
        .chain(pred_index.annotations_by_image.keys())
        .copied()
        .sorted_unstable()
        .dedup()
        .collect();

    let mut stats = AnalysisStats {
        gt_images: gt_index.annotations_by_image.len(),
        pred_images: pred_index.annotations_by_image.len(),
        evaluated_images: image_ids.len(),
        matched_pairs: 0,
    };
    log::info!(
        "Evaluating {} images ({} with ground truth, {} with predictions)",
        stats.evaluated_images,
        stats.gt_images,
        stats.pred_images
    );

    let mut examples = HardExamples::default();
    for image_id in image_ids {
        let result = match_image(
            gt_index.annotations_for_image(image_id),
            pred_index.annotations_for_image(image_id),
            thresholds.iou_threshold,
            format,
        );
        stats.matched_pairs += result.matched.len();
        examples.classify_image(image_id, &result, thresholds);
    }

    log::info!(
        "Matched {} pairs, {} hard examples",
        stats.matched_pairs,
        examples.total()
    );

    Ok(Analysis {
        thresholds: *thresholds,
        format,
        stats,
        examples,
    })
}
