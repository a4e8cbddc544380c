// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Integration tests for COCO format support.

#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use crate::{
        mining::{BoxFormat, ErrorCategory, Materializer, Report, Thresholds, analyze},
        store::FsImageStore,
    };
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    const GROUND_TRUTH: &str = r#"{
        "info": {"year": 2017, "version": "1.0", "description": "COCO 2017 Dataset"},
        "licenses": [
            {"id": 1, "name": "CC BY 4.0", "url": "https://creativecommons.org/licenses/by/4.0/"}
        ],
        "images": [
            {"id": 1, "width": 64, "height": 64, "file_name": "val/000001.png", "coco_url": "http://x/1"},
            {"id": 2, "width": 64, "height": 64, "file_name": "val/000002.png"},
            {"id": 3, "width": 64, "height": 64, "file_name": "val/000003.png"}
        ],
        "annotations": [
            {"id": 1, "image_id": 1, "category_id": 18, "bbox": [4, 4, 20, 20], "area": 400, "iscrowd": 0},
            {"id": 2, "image_id": 2, "category_id": 18, "bbox": [4, 4, 20, 20], "area": 400, "iscrowd": 0},
            {"id": 3, "image_id": 3, "category_id": 1, "bbox": [10, 10, 20, 20], "area": 400, "iscrowd": 0}
        ],
        "categories": [
            {"id": 1, "name": "person", "supercategory": "person"},
            {"id": 18, "name": "dog", "supercategory": "animal"}
        ]
    }"#;

    const PREDICTIONS: &str = r#"{
        "images": [
            {"id": 1, "file_name": "000001.png"},
            {"id": 2, "file_name": "000002.png"},
            {"id": 3, "file_name": "000003.png"}
        ],
        "annotations": [
            {"image_id": 1, "category_id": 18, "bbox": [4, 4, 20, 20], "score": 0.95},
            {"image_id": 2, "category_id": 18, "bbox": [40, 40, 20, 20], "score": 0.85},
            {"image_id": 3, "category_id": 1, "bbox": [14, 14, 20, 20], "score": 0.25}
        ]
    }"#;

    fn setup(temp_dir: &TempDir) -> (CocoDataset, CocoDataset) {
        let images = temp_dir.path().join("images").join("val");
        std::fs::create_dir_all(&images).unwrap();
        for id in 1..=3 {
            RgbImage::from_pixel(64, 64, Rgb([20, 20, 20]))
                .save(images.join(format!("{:06}.png", id)))
                .unwrap();
        }

        let gt_path = temp_dir.path().join("gt.json");
        let pred_path = temp_dir.path().join("pred.json");
        std::fs::write(&gt_path, GROUND_TRUTH).unwrap();
        std::fs::write(&pred_path, PREDICTIONS).unwrap();

        let reader = CocoReader::with_options(CocoReadOptions { validate: true });
        (
            reader.read_json(&gt_path).unwrap(),
            reader.read_json(&pred_path).unwrap(),
        )
    }

    /// Read, mine, report and materialize on real files.
    #[test]
    fn test_compare_predictions_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let (gt, pred) = setup(&temp_dir);

        let analysis = analyze(&gt, &pred, &Thresholds::default(), BoxFormat::Xywh).unwrap();
        let examples = &analysis.examples;
        assert_eq!(examples.high_score_false_positives.len(), 1);
        assert_eq!(examples.low_score_misses.len(), 1);
        // Image 3: IoU 256/544 and score 0.25.
        assert_eq!(examples.poor_localization.len(), 1);
        assert_eq!(examples.low_confidence_matches.len(), 1);

        let report = Report::from_analysis(&analysis, &gt);
        let misses = report.category(ErrorCategory::LowScoreMisses).unwrap();
        assert_eq!(misses.examples, vec!["image 2: category=18 (dog)"]);

        let out = temp_dir.path().join("out");
        let store = FsImageStore::without_font();
        let summary = Materializer::new(&store, temp_dir.path().join("images"), &out)
            .materialize(&gt, &pred, examples, None)
            .unwrap();
        assert_eq!(summary.total_copied(), 4);
        assert_eq!(summary.total_visualized(), 4);

        assert!(out.join("low_score_misses/raw/000002.png").is_file());
        let vis = image::open(out.join("low_score_misses/vis/000002.png"))
            .unwrap()
            .to_rgb8();
        // Ground-truth outline at x=4 and prediction outline at x=40.
        assert_eq!(*vis.get_pixel(4, 10), Rgb([0, 255, 0]));
        assert_eq!(*vis.get_pixel(40, 50), Rgb([255, 0, 0]));

        let loc = CocoReader::new()
            .read_json(out.join("cocojson/poor_localization.gt.json"))
            .unwrap();
        assert_eq!(loc.images.len(), 1);
        assert_eq!(loc.images[0].file_name, "poor_localization/raw/000003.png");
        assert_eq!(loc.info.as_ref().unwrap().year, Some(2017));
        assert_eq!(loc.licenses.as_ref().unwrap().len(), 1);
        assert_eq!(loc.annotations[0].extra["iscrowd"], serde_json::json!(0));

        let loc_pred = CocoReader::new()
            .read_json(out.join("cocojson/poor_localization.pred.json"))
            .unwrap();
        assert!(loc_pred.categories.is_none());
        assert!(loc_pred.info.is_none());
        assert_eq!(loc_pred.annotations[0].score, Some(0.25));
    }

    /// Fields the tools do not model survive a read/write cycle.
    #[test]
    fn test_passthrough_fields_survive() {
        let temp_dir = TempDir::new().unwrap();
        let (gt, _) = setup(&temp_dir);

        let path = temp_dir.path().join("copy.json");
        CocoWriter::with_options(CocoWriteOptions { pretty: true })
            .write_json(&gt, &path)
            .unwrap();
        let restored = CocoReader::new().read_json(&path).unwrap();

        let source: serde_json::Value = serde_json::from_str(GROUND_TRUTH).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(source["images"][0]["coco_url"], written["images"][0]["coco_url"]);
        assert_eq!(source["categories"], written["categories"]);
        assert_eq!(restored.annotations, gt.annotations);
    }

    /// Dataset tools against the same fixture.
    #[test]
    fn test_tools_on_fixture() {
        let temp_dir = TempDir::new().unwrap();
        let (_, pred) = setup(&temp_dir);
        std::fs::remove_file(temp_dir.path().join("images/val/000002.png")).unwrap();

        let store = FsImageStore::without_font();
        let mut with_paths = pred.clone();
        for img in &mut with_paths.images {
            img.file_name = format!("val/{}", img.file_name);
        }
        let (kept, removed) =
            remove_missing(&with_paths, &temp_dir.path().join("images"), &store);
        assert_eq!(kept.images.len(), 2);
        assert_eq!(kept.annotations.len(), 2);
        assert_eq!(removed.len(), 1);

        let range = ScoreRange::new(Some(0.5), None).unwrap();
        let selected = select_by_score(&with_paths, &range);
        let summary = export_images(
            &with_paths,
            &selected,
            &temp_dir.path().join("images"),
            &temp_dir.path().join("selected"),
            &store,
            Some(BoxFormat::Xywh),
        );
        assert_eq!(summary.selected, 2);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.failed, 1);
        assert!(temp_dir.path().join("selected/val/000001.png").is_file());
    }
}
