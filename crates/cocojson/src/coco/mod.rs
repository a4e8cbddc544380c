// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # COCO Dataset Format Support
//!
//! Typed reading and writing of COCO detection JSON, plus the clean-up tools
//! used while curating a dataset.
//!
//! ## Scope
//!
//! - Bounding boxes with optional detection `score`
//! - Every other field (segmentation, area, iscrowd, ...) passes through
//!   untouched
//! - Incomplete documents can be repaired from their raw JSON with
//!   [`complete_document`] before typed use
//!
//! ## Example
//!
//! ```rust,no_run
//! use cocojson::coco::{CocoReader, CocoWriter, derived_path, remove_empty};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), cocojson::Error> {
//! let input = Path::new("annotations/instances_val2017.json");
//! let dataset = CocoReader::new().read_json(input)?;
//! println!("Found {} images and {} annotations",
//!          dataset.images.len(), dataset.annotations.len());
//!
//! let (kept, _empty) = remove_empty(&dataset);
//! CocoWriter::new().write_json(&kept, derived_path(input, "_noempty"))?;
//! # Ok(())
//! # }
//! ```

mod complete;
mod reader;
mod tools;
mod types;
mod writer;

#[cfg(test)]
mod tests;

// Re-export types
pub use types::{
    CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoIndex, CocoInfo, CocoLicense,
};

// Re-export readers/writers
pub use reader::{CocoReadOptions, CocoReader, validate_dataset};
pub use writer::{CocoWriteOptions, CocoWriter};

// Re-export dataset tools
pub use complete::{
    CompletionReport, REQUIRED_SECTIONS, SectionCompletion, complete_dataset, complete_document,
};
pub use tools::{
    ExportSummary, ScoreRange, derived_path, exclude_images, export_images, remove_empty,
    remove_missing, select_by_score,
};
