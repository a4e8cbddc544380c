// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Error taxonomy for hard-example mining.
//!
//! Four rules run independently over each image's match result:
//!
//! | Category | Source | Trigger |
//! |---|---|---|
//! | `high_score_false_positives` | unmatched predictions | `score >= false_positive_score_threshold` |
//! | `low_score_misses` | unmatched ground truth | always |
//! | `poor_localization` | matched pairs | `iou < ideal_iou_threshold` |
//! | `low_confidence_matches` | matched pairs | `score < minimum_score_threshold` |
//!
//! A matched pair can land in both of the last two lists. Predictions
//! without a score are classified as if they scored `0`.

use super::matcher::ImageMatch;
use crate::{Error, coco::CocoAnnotation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Numeric policy for matching and classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum IoU for a prediction to match a ground-truth box.
    pub iou_threshold: f64,
    /// IoU below which a match counts as poorly localized.
    pub ideal_iou_threshold: f64,
    /// Score below which a match counts as low confidence.
    pub minimum_score_threshold: f64,
    /// Score at or above which an unmatched prediction is a false positive
    /// worth reviewing.
    pub false_positive_score_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            ideal_iou_threshold: 0.6,
            minimum_score_threshold: 0.4,
            false_positive_score_threshold: 0.4,
        }
    }
}

impl Thresholds {
    /// Check every threshold lies in `[0, 1]` and the matching threshold
    /// does not exceed the localization bar.
    pub fn validate(&self) -> Result<(), Error> {
        let named = [
            ("iou_threshold", self.iou_threshold),
            ("ideal_iou_threshold", self.ideal_iou_threshold),
            ("minimum_score_threshold", self.minimum_score_threshold),
            (
                "false_positive_score_threshold",
                self.false_positive_score_threshold,
            ),
        ];
        for (name, value) in named {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidParameters(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.iou_threshold > self.ideal_iou_threshold {
            return Err(Error::InvalidParameters(format!(
                "iou_threshold ({}) must not exceed ideal_iou_threshold ({})",
                self.iou_threshold, self.ideal_iou_threshold
            )));
        }

        Ok(())
    }
}

/// The four kinds of hard example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCategory {
    HighScoreFalsePositives,
    LowScoreMisses,
    PoorLocalization,
    LowConfidenceMatches,
}

impl ErrorCategory {
    /// Every category, in report order.
    pub const ALL: [ErrorCategory; 4] = [
        ErrorCategory::HighScoreFalsePositives,
        ErrorCategory::LowScoreMisses,
        ErrorCategory::PoorLocalization,
        ErrorCategory::LowConfidenceMatches,
    ];

    /// Stable key used for output directory and file names.
    pub fn key(&self) -> &'static str {
        match self {
            ErrorCategory::HighScoreFalsePositives => "high_score_false_positives",
            ErrorCategory::LowScoreMisses => "low_score_misses",
            ErrorCategory::PoorLocalization => "poor_localization",
            ErrorCategory::LowConfidenceMatches => "low_confidence_matches",
        }
    }

    /// Human readable title.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCategory::HighScoreFalsePositives => "High-score false positives",
            ErrorCategory::LowScoreMisses => "Low-score misses",
            ErrorCategory::PoorLocalization => "Poor localization",
            ErrorCategory::LowConfidenceMatches => "Low-confidence matches",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl TryFrom<&str> for ErrorCategory {
    type Error = crate::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        ErrorCategory::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| Error::InvalidParameters(format!("Unknown error category: {}", s)))
    }
}

/// One piece of evidence for a category.
#[derive(Debug, Clone, Copy)]
pub enum ErrorRecord<'a> {
    /// Unmatched prediction with a high score.
    FalsePositive {
        image_id: u64,
        pred: &'a CocoAnnotation,
        score: f64,
    },
    /// Ground truth no prediction matched.
    Miss {
        image_id: u64,
        gt: &'a CocoAnnotation,
    },
    /// Match whose IoU is below the localization bar.
    PoorLocalization {
        image_id: u64,
        gt: &'a CocoAnnotation,
        pred: &'a CocoAnnotation,
        iou: f64,
        score: f64,
    },
    /// Match whose prediction score is below the confidence floor.
    LowConfidence {
        image_id: u64,
        gt: &'a CocoAnnotation,
        pred: &'a CocoAnnotation,
        iou: f64,
        score: f64,
    },
}

impl ErrorRecord<'_> {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorRecord::FalsePositive { .. } => ErrorCategory::HighScoreFalsePositives,
            ErrorRecord::Miss { .. } => ErrorCategory::LowScoreMisses,
            ErrorRecord::PoorLocalization { .. } => ErrorCategory::PoorLocalization,
            ErrorRecord::LowConfidence { .. } => ErrorCategory::LowConfidenceMatches,
        }
    }

    pub fn image_id(&self) -> u64 {
        match self {
            ErrorRecord::FalsePositive { image_id, .. }
            | ErrorRecord::Miss { image_id, .. }
            | ErrorRecord::PoorLocalization { image_id, .. }
            | ErrorRecord::LowConfidence { image_id, .. } => *image_id,
        }
    }

    /// Prediction score, when the record involves a prediction.
    pub fn score(&self) -> Option<f64> {
        match self {
            ErrorRecord::FalsePositive { score, .. }
            | ErrorRecord::PoorLocalization { score, .. }
            | ErrorRecord::LowConfidence { score, .. } => Some(*score),
            ErrorRecord::Miss { .. } => None,
        }
    }

    /// IoU of the matched pair, when the record involves one.
    pub fn iou(&self) -> Option<f64> {
        match self {
            ErrorRecord::PoorLocalization { iou, .. } | ErrorRecord::LowConfidence { iou, .. } => {
                Some(*iou)
            }
            _ => None,
        }
    }
}

/// Evidence lists for the four categories, in classification order.
#[derive(Debug, Clone, Default)]
pub struct HardExamples<'a> {
    pub high_score_false_positives: Vec<ErrorRecord<'a>>,
    pub low_score_misses: Vec<ErrorRecord<'a>>,
    pub poor_localization: Vec<ErrorRecord<'a>>,
    pub low_confidence_matches: Vec<ErrorRecord<'a>>,
}

impl<'a> HardExamples<'a> {
    /// Apply the four rules to one image's match result and append the
    /// resulting records.
    pub fn classify_image(
        &mut self,
        image_id: u64,
        result: &ImageMatch<'a>,
        thresholds: &Thresholds,
    ) {
        for pred in result.unmatched_pred.iter().copied() {
            let score = pred.score_or(0.0);
            if score >= thresholds.false_positive_score_threshold {
                self.high_score_false_positives
                    .push(ErrorRecord::FalsePositive {
                        image_id,
                        pred,
                        score,
                    });
            }
        }

        for gt in result.unmatched_gt.iter().copied() {
            self.low_score_misses.push(ErrorRecord::Miss { image_id, gt });
        }

        for pair in &result.matched {
            let score = pair.pred.score_or(0.0);
            if pair.iou < thresholds.ideal_iou_threshold {
                self.poor_localization.push(ErrorRecord::PoorLocalization {
                    image_id,
                    gt: pair.gt,
                    pred: pair.pred,
                    iou: pair.iou,
                    score,
                });
            }
        }

        for pair in &result.matched {
            let score = pair.pred.score_or(0.0);
            if score < thresholds.minimum_score_threshold {
                self.low_confidence_matches
                    .push(ErrorRecord::LowConfidence {
                        image_id,
                        gt: pair.gt,
                        pred: pair.pred,
                        iou: pair.iou,
                        score,
                    });
            }
        }
    }

    pub fn records(&self, category: ErrorCategory) -> &[ErrorRecord<'a>] {
        match category {
            ErrorCategory::HighScoreFalsePositives => &self.high_score_false_positives,
            ErrorCategory::LowScoreMisses => &self.low_score_misses,
            ErrorCategory::PoorLocalization => &self.poor_localization,
            ErrorCategory::LowConfidenceMatches => &self.low_confidence_matches,
        }
    }

    fn records_mut(&mut self, category: ErrorCategory) -> &mut Vec<ErrorRecord<'a>> {
        match category {
            ErrorCategory::HighScoreFalsePositives => &mut self.high_score_false_positives,
            ErrorCategory::LowScoreMisses => &mut self.low_score_misses,
            ErrorCategory::PoorLocalization => &mut self.poor_localization,
            ErrorCategory::LowConfidenceMatches => &mut self.low_confidence_matches,
        }
    }

    /// Distinct image ids touched by a category, ascending.
    pub fn image_ids(&self, category: ErrorCategory) -> BTreeSet<u64> {
        self.records(category)
            .iter()
            .map(ErrorRecord::image_id)
            .collect()
    }

    /// Total number of records across all categories.
    pub fn total(&self) -> usize {
        ErrorCategory::ALL
            .iter()
            .map(|c| self.records(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Keep only the first `max` records of each category (0 = unlimited).
    pub fn truncate(&mut self, max: usize) {
        if max == 0 {
            return;
        }
        for category in ErrorCategory::ALL {
            let records = self.records_mut(category);
            if records.len() > max {
                log::debug!(
                    "Capping {} from {} to {} records",
                    category,
                    records.len(),
                    max
                );
                records.truncate(max);
            }
        }
    }
}
