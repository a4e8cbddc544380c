// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON reader.

use super::types::*;
use crate::Error;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Options for COCO reading.
#[derive(Debug, Clone, Default)]
pub struct CocoReadOptions {
    /// If true, validate all annotations during reading.
    pub validate: bool,
}

/// COCO reader for ground-truth and prediction documents.
///
/// # Example
///
/// ```rust,no_run
/// use cocojson::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let dataset = reader.read_json("annotations/instances_val2017.json")?;
/// println!("Loaded {} images", dataset.images.len());
/// # Ok::<(), cocojson::Error>(())
/// ```
pub struct CocoReader {
    options: CocoReadOptions,
}

impl CocoReader {
    /// Create a new COCO reader with default options.
    pub fn new() -> Self {
        Self {
            options: CocoReadOptions::default(),
        }
    }

    /// Create a new COCO reader with custom options.
    pub fn with_options(options: CocoReadOptions) -> Self {
        Self { options }
    }

    /// Read COCO dataset from a JSON file.
    ///
    /// A missing file is reported as [`Error::MissingFile`] before anything
    /// is parsed. Malformed JSON and documents without `images` or
    /// `annotations` fail with [`Error::JsonError`].
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }

        let dataset: CocoDataset = serde_json::from_reader(open_buffered(path)?)?;

        log::debug!(
            "Read {}: {} images, {} annotations",
            path.display(),
            dataset.images.len(),
            dataset.annotations.len()
        );

        if self.options.validate {
            validate_dataset(&dataset)?;
        }

        Ok(dataset)
    }

    /// Read a JSON document without interpreting it as COCO.
    ///
    /// Used for documents too incomplete to deserialize, see
    /// [`complete_document`](super::complete_document).
    pub fn read_value<P: AsRef<Path>>(&self, path: P) -> Result<serde_json::Value, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        Ok(serde_json::from_reader(open_buffered(path)?)?)
    }
}

fn open_buffered(path: &Path) -> Result<BufReader<File>, Error> {
    Ok(BufReader::with_capacity(64 * 1024, File::open(path)?))
}

impl Default for CocoReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a COCO dataset for consistency.
///
/// Every annotation must reference an existing image, reference a declared
/// category when the dataset declares categories, and carry a box with
/// non-negative width and height.
pub fn validate_dataset(dataset: &CocoDataset) -> Result<(), Error> {
    let image_ids: HashSet<_> = dataset.images.iter().map(|i| i.id).collect();
    let category_ids: Option<HashSet<_>> = dataset
        .categories
        .as_ref()
        .map(|cats| cats.iter().map(|c| c.id).collect());

    for ann in &dataset.annotations {
        if !image_ids.contains(&ann.image_id) {
            return Err(Error::CocoError(format!(
                "Annotation {} references non-existent image_id {}",
                ann.id, ann.image_id
            )));
        }

        if let Some(category_ids) = &category_ids
            && !category_ids.contains(&ann.category_id)
        {
            return Err(Error::CocoError(format!(
                "Annotation {} references non-existent category_id {}",
                ann.id, ann.category_id
            )));
        }

        if ann.bbox[2] < 0.0 || ann.bbox[3] < 0.0 {
            return Err(Error::CocoError(format!(
                "Annotation {} has negative bbox dimensions",
                ann.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_dataset() -> CocoDataset {
        CocoDataset {
            images: vec![CocoImage {
                id: 1,
                file_name: "test.jpg".to_string(),
                width: Some(640),
                height: Some(480),
                ..Default::default()
            }],
            categories: Some(vec![CocoCategory {
                id: 1,
                name: "person".to_string(),
                ..Default::default()
            }]),
            annotations: vec![CocoAnnotation {
                id: 1,
                image_id: 1,
                category_id: 1,
                bbox: [10.0, 20.0, 100.0, 80.0],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_reader_default() {
        let reader = CocoReader::new();
        assert!(!reader.options.validate);
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope.json");

        let err = CocoReader::new().read_json(&path).unwrap_err();
        assert!(matches!(err, Error::MissingFile(p) if p == path));
    }

    #[test]
    fn test_read_malformed_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{\"images\": [").unwrap();

        let err = CocoReader::new().read_json(&path).unwrap_err();
        assert!(matches!(err, Error::JsonError(_)));
    }

    #[test]
    fn test_read_missing_annotations_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("no_annotations.json");
        std::fs::write(&path, r#"{"images": [{"id": 1, "file_name": "a.jpg"}]}"#).unwrap();

        let err = CocoReader::new().read_json(&path).unwrap_err();
        assert!(err.to_string().contains("annotations"));
    }

    #[test]
    fn test_read_value_accepts_incomplete_documents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("partial.json");
        std::fs::write(&path, r#"{"images": [{"id": 1}]}"#).unwrap();

        let reader = CocoReader::new();
        assert!(reader.read_json(&path).is_err());
        let value = reader.read_value(&path).unwrap();
        assert_eq!(value["images"][0]["id"], serde_json::json!(1));

        let missing = temp_dir.path().join("absent.json");
        assert!(matches!(
            reader.read_value(&missing),
            Err(Error::MissingFile(p)) if p == missing
        ));
    }

    #[test]
    fn test_read_json_with_validation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("valid.json");
        std::fs::write(&path, serde_json::to_string(&sample_dataset()).unwrap()).unwrap();

        let reader = CocoReader::with_options(CocoReadOptions { validate: true });
        let dataset = reader.read_json(&path).unwrap();
        assert_eq!(dataset.images.len(), 1);
        assert_eq!(dataset.annotations.len(), 1);
    }

    #[test]
    fn test_validate_dataset_valid() {
        assert!(validate_dataset(&sample_dataset()).is_ok());
    }

    #[test]
    fn test_validate_dataset_missing_image() {
        let mut dataset = sample_dataset();
        dataset.annotations[0].image_id = 999;
        assert!(validate_dataset(&dataset).is_err());
    }

    #[test]
    fn test_validate_dataset_unknown_category() {
        let mut dataset = sample_dataset();
        dataset.annotations[0].category_id = 42;
        assert!(validate_dataset(&dataset).is_err());

        // Without a categories section there is nothing to check against.
        dataset.categories = None;
        assert!(validate_dataset(&dataset).is_ok());
    }

    #[test]
    fn test_validate_dataset_negative_box() {
        let mut dataset = sample_dataset();
        dataset.annotations[0].bbox = [0.0, 0.0, -5.0, 10.0];
        assert!(validate_dataset(&dataset).is_err());
    }
}
