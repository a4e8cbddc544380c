// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON data structures for serde serialization/deserialization.
//!
//! Only the fields the curation tools reason about are typed. Everything else
//! (segmentation, area, iscrowd, flickr_url, ...) is kept in a flattened
//! `extra` map so a document read and written back keeps its content.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Top-level COCO dataset structure.
///
/// Used for both ground-truth and prediction documents. `images` and
/// `annotations` are required; the remaining sections are carried through
/// unmodified and stay absent on output when absent on input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoDataset {
    /// List of images in the dataset.
    pub images: Vec<CocoImage>,
    /// List of annotations (one per object instance or prediction).
    pub annotations: Vec<CocoAnnotation>,
    /// List of object categories/classes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CocoCategory>>,
    /// Dataset metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<CocoInfo>,
    /// License information for the images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licenses: Option<Vec<CocoLicense>>,
}

impl CocoDataset {
    /// Categories declared by the dataset, empty when the section is absent.
    pub fn categories(&self) -> &[CocoCategory] {
        self.categories.as_deref().unwrap_or(&[])
    }

    /// Copy of the dataset with new image and annotation lists and the
    /// passthrough sections cloned as-is.
    pub fn with_content(&self, images: Vec<CocoImage>, annotations: Vec<CocoAnnotation>) -> Self {
        Self {
            images,
            annotations,
            categories: self.categories.clone(),
            info: self.info.clone(),
            licenses: self.licenses.clone(),
        }
    }
}

/// Dataset metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoInfo {
    /// Year the dataset was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Dataset description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Dataset contributor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
    /// Dataset URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Date the dataset was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// License information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoLicense {
    /// Unique license ID.
    pub id: u32,
    /// License name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// License URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Image metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoImage {
    /// Unique image ID within one dataset.
    pub id: u64,
    /// Filename (relative path within the images folder).
    pub file_name: String,
    /// Image width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Image height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CocoImage {
    /// Final path component of `file_name`.
    pub fn basename(&self) -> &str {
        self.file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file_name)
    }
}

/// Category definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoCategory {
    /// Unique category ID.
    pub id: u32,
    /// Category name (e.g., "person", "car").
    pub name: String,
    /// Parent category name (e.g., "human" for "person").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Annotation for object detection.
///
/// Ground-truth annotations usually have no `score`; prediction annotations
/// carry the detector confidence there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// Annotation ID. Prediction dumps often omit it, in which case it is 0.
    #[serde(default)]
    pub id: u64,
    /// ID of the image containing this object.
    pub image_id: u64,
    /// Category ID of this object.
    pub category_id: u32,
    /// Bounding box, `[x, y, width, height]` in pixels unless the dataset is
    /// read with a different box format.
    pub bbox: [f64; 4],
    /// Detection confidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CocoAnnotation {
    /// Confidence, or `default` when the annotation carries no score.
    pub fn score_or(&self, default: f64) -> f64 {
        self.score.unwrap_or(default)
    }
}

/// Lookup tables over a borrowed `CocoDataset`.
#[derive(Debug, Clone)]
pub struct CocoIndex<'a> {
    /// `image_id` → first `CocoImage` with that id
    pub images: HashMap<u64, &'a CocoImage>,
    /// `category_id` → `CocoCategory`
    pub categories: HashMap<u32, &'a CocoCategory>,
    /// `image_id` → annotations in document order
    pub annotations_by_image: HashMap<u64, Vec<&'a CocoAnnotation>>,
}

impl<'a> CocoIndex<'a> {
    /// Build lookup index from a `CocoDataset`.
    pub fn from_dataset(dataset: &'a CocoDataset) -> Self {
        let mut images = HashMap::with_capacity(dataset.images.len());
        for img in &dataset.images {
            images.entry(img.id).or_insert(img);
        }

        let categories: HashMap<_, _> = dataset.categories().iter().map(|c| (c.id, c)).collect();

        let mut annotations_by_image: HashMap<u64, Vec<&CocoAnnotation>> = HashMap::new();
        for ann in &dataset.annotations {
            annotations_by_image
                .entry(ann.image_id)
                .or_default()
                .push(ann);
        }

        Self {
            images,
            categories,
            annotations_by_image,
        }
    }

    /// Get the label name for a category ID.
    pub fn label_name(&self, category_id: u32) -> Option<&'a str> {
        self.categories.get(&category_id).map(|c| c.name.as_str())
    }

    /// Get annotations for an image.
    pub fn annotations_for_image(&self, image_id: u64) -> &[&'a CocoAnnotation] {
        self.annotations_by_image
            .get(&image_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_dataset_default() {
        let dataset = CocoDataset::default();
        assert!(dataset.images.is_empty());
        assert!(dataset.annotations.is_empty());
        assert!(dataset.categories().is_empty());
    }

    #[test]
    fn test_required_sections() {
        let missing_images = r#"{"annotations": []}"#;
        assert!(serde_json::from_str::<CocoDataset>(missing_images).is_err());

        let missing_annotations = r#"{"images": []}"#;
        assert!(serde_json::from_str::<CocoDataset>(missing_annotations).is_err());

        let minimal = r#"{"images": [], "annotations": []}"#;
        let dataset: CocoDataset = serde_json::from_str(minimal).unwrap();
        assert!(dataset.categories.is_none());
        assert!(dataset.info.is_none());
        assert!(dataset.licenses.is_none());
    }

    #[test]
    fn test_absent_sections_stay_absent() {
        let dataset: CocoDataset =
            serde_json::from_str(r#"{"images": [], "annotations": []}"#).unwrap();
        let json = serde_json::to_value(&dataset).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("images"));
        assert!(object.contains_key("annotations"));
        assert!(!object.contains_key("categories"));
        assert!(!object.contains_key("info"));
        assert!(!object.contains_key("licenses"));
    }

    #[test]
    fn test_extra_fields_preserved() {
        let json = r#"{
            "id": 7,
            "image_id": 3,
            "category_id": 1,
            "bbox": [1.0, 2.0, 3.0, 4.0],
            "area": 12.0,
            "iscrowd": 0,
            "segmentation": [[1.0, 2.0, 4.0, 2.0, 4.0, 6.0]]
        }"#;
        let ann: CocoAnnotation = serde_json::from_str(json).unwrap();
        assert_eq!(ann.score, None);
        assert_eq!(ann.extra.get("area"), Some(&Value::from(12.0)));
        assert!(ann.extra.contains_key("segmentation"));

        let written = serde_json::to_value(&ann).unwrap();
        assert_eq!(written["iscrowd"], Value::from(0));
        assert!(written.get("score").is_none());
    }

    #[test]
    fn test_prediction_without_id() {
        let json = r#"{"image_id": 3, "category_id": 1, "bbox": [0, 0, 5, 5], "score": 0.75}"#;
        let ann: CocoAnnotation = serde_json::from_str(json).unwrap();
        assert_eq!(ann.id, 0);
        assert_eq!(ann.score_or(0.0), 0.75);
    }

    #[test]
    fn test_image_basename() {
        let image = CocoImage {
            id: 1,
            file_name: "train/2024/img_001.jpg".to_string(),
            ..Default::default()
        };
        assert_eq!(image.basename(), "img_001.jpg");

        let flat = CocoImage {
            id: 2,
            file_name: "img_002.jpg".to_string(),
            ..Default::default()
        };
        assert_eq!(flat.basename(), "img_002.jpg");
    }

    #[test]
    fn test_coco_index_from_dataset() {
        let dataset = CocoDataset {
            images: vec![
                CocoImage {
                    id: 1,
                    file_name: "image1.jpg".to_string(),
                    ..Default::default()
                },
                CocoImage {
                    id: 2,
                    file_name: "image2.jpg".to_string(),
                    ..Default::default()
                },
                CocoImage {
                    id: 1,
                    file_name: "duplicate.jpg".to_string(),
                    ..Default::default()
                },
            ],
            categories: Some(vec![
                CocoCategory {
                    id: 1,
                    name: "person".to_string(),
                    supercategory: Some("human".to_string()),
                    ..Default::default()
                },
                CocoCategory {
                    id: 2,
                    name: "car".to_string(),
                    ..Default::default()
                },
            ]),
            annotations: vec![
                CocoAnnotation {
                    id: 100,
                    image_id: 1,
                    category_id: 1,
                    bbox: [10.0, 20.0, 100.0, 200.0],
                    ..Default::default()
                },
                CocoAnnotation {
                    id: 101,
                    image_id: 1,
                    category_id: 2,
                    bbox: [50.0, 60.0, 150.0, 100.0],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let index = CocoIndex::from_dataset(&dataset);

        assert_eq!(index.images.len(), 2);
        assert_eq!(index.images[&1].file_name, "image1.jpg");

        assert_eq!(index.label_name(1), Some("person"));
        assert_eq!(index.label_name(2), Some("car"));
        assert_eq!(index.label_name(3), None);

        let anns = index.annotations_for_image(1);
        assert_eq!(anns.len(), 2);
        assert_eq!(anns[0].id, 100);
        assert_eq!(anns[1].id, 101);

        assert!(index.annotations_for_image(2).is_empty());
    }
}
