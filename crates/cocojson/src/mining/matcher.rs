// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Greedy first-fit box matching for a single image.
//!
//! Ground truth is visited in input order and, for each entry, every
//! prediction that is still unclaimed and clears the IoU threshold is paired
//! with it. A ground-truth box may therefore collect several predictions,
//! while a prediction is claimed at most once. This is not best-IoU matching:
//! reordering the inputs can change the result.

use super::geometry::{BoxFormat, BoxXyxy, iou, to_xyxy};
use crate::coco::CocoAnnotation;

/// A ground-truth/prediction pair that cleared the matching threshold.
#[derive(Debug, Clone, Copy)]
pub struct MatchedPair<'a> {
    /// Position of the ground truth in the image's ground-truth list.
    pub gt_index: usize,
    /// Position of the prediction in the image's prediction list.
    pub pred_index: usize,
    pub gt: &'a CocoAnnotation,
    pub pred: &'a CocoAnnotation,
    pub iou: f64,
}

/// Matcher output for one image.
#[derive(Debug, Clone, Default)]
pub struct ImageMatch<'a> {
    pub matched: Vec<MatchedPair<'a>>,
    pub unmatched_gt: Vec<&'a CocoAnnotation>,
    pub unmatched_pred: Vec<&'a CocoAnnotation>,
}

/// Match one image's ground truth against its predictions.
///
/// Bookkeeping is positional, so structurally identical annotations are
/// still told apart.
pub fn match_image<'a>(
    gt: &[&'a CocoAnnotation],
    pred: &[&'a CocoAnnotation],
    iou_threshold: f64,
    format: BoxFormat,
) -> ImageMatch<'a> {
    let pred_boxes: Vec<BoxXyxy> = pred.iter().map(|p| to_xyxy(&p.bbox, format)).collect();
    let mut claimed = vec![false; pred.len()];
    let mut gt_matched = vec![false; gt.len()];
    let mut matched = Vec::new();

    for (gt_index, gt_ann) in gt.iter().enumerate() {
        let gt_box = to_xyxy(&gt_ann.bbox, format);

        for (pred_index, pred_box) in pred_boxes.iter().enumerate() {
            if claimed[pred_index] {
                continue;
            }

            let value = iou(&gt_box, pred_box);
            if value >= iou_threshold {
                claimed[pred_index] = true;
                gt_matched[gt_index] = true;
                matched.push(MatchedPair {
                    gt_index,
                    pred_index,
                    gt: gt_ann,
                    pred: pred[pred_index],
                    iou: value,
                });
            }
        }
    }

    let unmatched_gt = gt
        .iter()
        .zip(&gt_matched)
        .filter(|(_, hit)| !**hit)
        .map(|(ann, _)| *ann)
        .collect();
    let unmatched_pred = pred
        .iter()
        .zip(&claimed)
        .filter(|(_, hit)| !**hit)
        .map(|(ann, _)| *ann)
        .collect();

    ImageMatch {
        matched,
        unmatched_gt,
        unmatched_pred,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(id: u64, bbox: [f64; 4], score: Option<f64>) -> CocoAnnotation {
        CocoAnnotation {
            id,
            image_id: 1,
            category_id: 1,
            bbox,
            score,
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_boxes_match() {
        let gt = [ann(1, [0.0, 0.0, 10.0, 10.0], None)];
        let pred = [ann(2, [0.0, 0.0, 10.0, 10.0], Some(0.9))];
        let gt_refs: Vec<_> = gt.iter().collect();
        let pred_refs: Vec<_> = pred.iter().collect();

        let result = match_image(&gt_refs, &pred_refs, 0.3, BoxFormat::Xywh);
        assert_eq!(result.matched.len(), 1);
        assert!((result.matched[0].iou - 1.0).abs() < 1e-9);
        assert!(result.unmatched_gt.is_empty());
        assert!(result.unmatched_pred.is_empty());
    }

    #[test]
    fn test_disjoint_boxes_unmatched() {
        let gt = [ann(1, [0.0, 0.0, 10.0, 10.0], None)];
        let pred = [ann(2, [20.0, 20.0, 10.0, 10.0], Some(0.8))];
        let gt_refs: Vec<_> = gt.iter().collect();
        let pred_refs: Vec<_> = pred.iter().collect();

        let result = match_image(&gt_refs, &pred_refs, 0.3, BoxFormat::Xywh);
        assert!(result.matched.is_empty());
        assert_eq!(result.unmatched_gt.len(), 1);
        assert_eq!(result.unmatched_pred.len(), 1);
    }

    #[test]
    fn test_one_gt_takes_every_qualifying_prediction() {
        let gt = [ann(1, [0.0, 0.0, 10.0, 10.0], None)];
        let pred = [
            ann(10, [0.0, 0.0, 10.0, 10.0], Some(0.9)),
            ann(11, [1.0, 1.0, 10.0, 10.0], Some(0.8)),
            ann(12, [50.0, 50.0, 10.0, 10.0], Some(0.7)),
        ];
        let gt_refs: Vec<_> = gt.iter().collect();
        let pred_refs: Vec<_> = pred.iter().collect();

        let result = match_image(&gt_refs, &pred_refs, 0.3, BoxFormat::Xywh);
        let pred_ids: Vec<_> = result.matched.iter().map(|m| m.pred.id).collect();
        assert_eq!(pred_ids, vec![10, 11]);
        assert!(result.matched.iter().all(|m| m.gt_index == 0));
        assert_eq!(result.unmatched_pred.len(), 1);
        assert_eq!(result.unmatched_pred[0].id, 12);
    }

    #[test]
    fn test_first_fit_by_order() {
        // The first ground truth overlaps the prediction less than the
        // second one does, but it is visited first and claims it.
        let gt = [
            ann(1, [0.0, 0.0, 10.0, 10.0], None),
            ann(2, [1.0, 1.0, 10.0, 10.0], None),
        ];
        let pred = [ann(10, [1.0, 1.0, 10.0, 10.0], Some(0.9))];
        let gt_refs: Vec<_> = gt.iter().collect();
        let pred_refs: Vec<_> = pred.iter().collect();

        let result = match_image(&gt_refs, &pred_refs, 0.3, BoxFormat::Xywh);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].gt.id, 1);
        assert!(result.matched[0].iou < 1.0);
        assert_eq!(result.unmatched_gt.len(), 1);
        assert_eq!(result.unmatched_gt[0].id, 2);
    }

    #[test]
    fn test_identical_ground_truth_entries() {
        // Two structurally identical ground-truth boxes and one prediction:
        // only the first is matched, the second stays unmatched.
        let gt = [
            ann(1, [0.0, 0.0, 10.0, 10.0], None),
            ann(1, [0.0, 0.0, 10.0, 10.0], None),
        ];
        let pred = [ann(10, [0.0, 0.0, 10.0, 10.0], Some(0.9))];
        let gt_refs: Vec<_> = gt.iter().collect();
        let pred_refs: Vec<_> = pred.iter().collect();

        let result = match_image(&gt_refs, &pred_refs, 0.3, BoxFormat::Xywh);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].gt_index, 0);
        assert_eq!(result.unmatched_gt.len(), 1);
        assert!(std::ptr::eq(result.unmatched_gt[0], &gt[1]));
    }

    #[test]
    fn test_empty_sides() {
        let gt = [ann(1, [0.0, 0.0, 10.0, 10.0], None)];
        let gt_refs: Vec<_> = gt.iter().collect();

        let result = match_image(&gt_refs, &[], 0.3, BoxFormat::Xywh);
        assert!(result.matched.is_empty());
        assert_eq!(result.unmatched_gt.len(), 1);

        let result = match_image(&[], &gt_refs, 0.3, BoxFormat::Xywh);
        assert!(result.matched.is_empty());
        assert_eq!(result.unmatched_pred.len(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // IoU of exactly 0.5: 10x10 vs 10x20 sharing the top half.
        let gt = [ann(1, [0.0, 0.0, 10.0, 10.0], None)];
        let pred = [ann(2, [0.0, 0.0, 10.0, 20.0], Some(0.5))];
        let gt_refs: Vec<_> = gt.iter().collect();
        let pred_refs: Vec<_> = pred.iter().collect();

        let result = match_image(&gt_refs, &pred_refs, 0.5, BoxFormat::Xywh);
        assert_eq!(result.matched.len(), 1);
    }

    #[test]
    fn test_partition_invariants() {
        let gt = [
            ann(1, [0.0, 0.0, 10.0, 10.0], None),
            ann(2, [30.0, 30.0, 10.0, 10.0], None),
            ann(3, [60.0, 0.0, 10.0, 10.0], None),
        ];
        let pred = [
            ann(10, [0.0, 0.0, 10.0, 10.0], Some(0.9)),
            ann(11, [1.0, 0.0, 10.0, 10.0], Some(0.2)),
            ann(12, [31.0, 31.0, 10.0, 10.0], Some(0.6)),
            ann(13, [90.0, 90.0, 5.0, 5.0], Some(0.95)),
        ];
        let gt_refs: Vec<_> = gt.iter().collect();
        let pred_refs: Vec<_> = pred.iter().collect();

        let result = match_image(&gt_refs, &pred_refs, 0.3, BoxFormat::Xywh);

        // Every prediction index is claimed by exactly one pair or unmatched.
        for (index, p) in pred.iter().enumerate() {
            let claims = result
                .matched
                .iter()
                .filter(|m| m.pred_index == index)
                .count();
            let unmatched = result
                .unmatched_pred
                .iter()
                .filter(|u| std::ptr::eq(**u, p))
                .count();
            assert_eq!(claims + unmatched, 1);
        }

        // Every ground truth is either matched or unmatched, never both.
        for (index, g) in gt.iter().enumerate() {
            let matched = result.matched.iter().any(|m| m.gt_index == index);
            let unmatched = result.unmatched_gt.iter().any(|u| std::ptr::eq(*u, g));
            assert!(matched ^ unmatched);
        }

        assert_eq!(result.matched.len(), 3);
        assert_eq!(result.unmatched_gt.len(), 1);
        assert_eq!(result.unmatched_gt[0].id, 3);
    }
}
