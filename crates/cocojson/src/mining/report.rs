// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Textual summary of a mining run.

use super::{
    Analysis, AnalysisStats,
    classifier::{ErrorCategory, ErrorRecord, Thresholds},
};
use crate::coco::{CocoDataset, CocoIndex};
use std::fmt;

/// Example lines kept per category.
const MAX_EXAMPLES: usize = 3;

/// Count and sample lines for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: ErrorCategory,
    pub total: usize,
    pub examples: Vec<String>,
}

impl CategorySummary {
    /// Records beyond the ones listed.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.examples.len())
    }
}

/// Aggregate result of an analysis, rendered with `Display`.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub thresholds: Thresholds,
    pub stats: AnalysisStats,
    pub categories: Vec<CategorySummary>,
}

impl Report {
    /// Summarise `analysis`. Category names for misses are looked up in the
    /// ground-truth `categories` section.
    ///
    /// Counts reflect the records present at call time, so build the report
    /// before capping to show the full totals.
    pub fn from_analysis(analysis: &Analysis<'_>, gt: &CocoDataset) -> Self {
        let index = CocoIndex::from_dataset(gt);
        let categories = ErrorCategory::ALL
            .into_iter()
            .map(|category| {
                let records = analysis.examples.records(category);
                CategorySummary {
                    category,
                    total: records.len(),
                    examples: records
                        .iter()
                        .take(MAX_EXAMPLES)
                        .map(|r| describe(r, &index))
                        .collect(),
                }
            })
            .collect();

        Self {
            thresholds: analysis.thresholds,
            stats: analysis.stats,
            categories,
        }
    }

    pub fn category(&self, category: ErrorCategory) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn total(&self) -> usize {
        self.categories.iter().map(|c| c.total).sum()
    }
}

fn describe(record: &ErrorRecord<'_>, index: &CocoIndex<'_>) -> String {
    match record {
        ErrorRecord::FalsePositive {
            image_id, score, ..
        } => format!("image {}: score={:.3}", image_id, score),
        ErrorRecord::Miss { image_id, gt } => match index.label_name(gt.category_id) {
            Some(name) => format!(
                "image {}: category={} ({})",
                image_id, gt.category_id, name
            ),
            None => format!("image {}: category={}", image_id, gt.category_id),
        },
        ErrorRecord::PoorLocalization {
            image_id,
            iou,
            score,
            ..
        }
        | ErrorRecord::LowConfidence {
            image_id,
            iou,
            score,
            ..
        } => format!("image {}: score={:.3}, iou={:.3}", image_id, score, iou),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "╔══════════════════════════════════════════════════════════════╗"
        )?;
        writeln!(
            f,
            "║                    HARD EXAMPLE ANALYSIS                     ║"
        )?;
        writeln!(
            f,
            "╠══════════════════════════════════════════════════════════════╣"
        )?;
        writeln!(
            f,
            "║ Thresholds: iou={:.2}, ideal_iou={:.2}, min_score={:.2}, fp_score={:.2}",
            self.thresholds.iou_threshold,
            self.thresholds.ideal_iou_threshold,
            self.thresholds.minimum_score_threshold,
            self.thresholds.false_positive_score_threshold
        )?;
        writeln!(
            f,
            "║ Images:     {} evaluated ({} ground truth, {} predicted)",
            self.stats.evaluated_images, self.stats.gt_images, self.stats.pred_images
        )?;
        writeln!(f, "║ Matches:    {}", self.stats.matched_pairs)?;
        for summary in &self.categories {
            writeln!(
                f,
                "╠══════════════════════════════════════════════════════════════╣"
            )?;
            writeln!(
                f,
                "║ {} [{}]: {}",
                summary.category.title(),
                summary.category.key(),
                summary.total
            )?;
            for line in &summary.examples {
                writeln!(f, "║   - {}", line)?;
            }
            if summary.remaining() > 0 {
                writeln!(f, "║   ... and {} more", summary.remaining())?;
            }
        }
        writeln!(
            f,
            "╚══════════════════════════════════════════════════════════════╝"
        )?;
        Ok(())
    }
}
