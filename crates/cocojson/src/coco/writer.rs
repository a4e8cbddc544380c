// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON writer.

use super::types::CocoDataset;
use crate::Error;
use std::{
    io::{BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// Options for COCO writing.
#[derive(Debug, Clone, Default)]
pub struct CocoWriteOptions {
    /// Pretty-print JSON with indentation.
    pub pretty: bool,
}

/// COCO writer for generating JSON files.
///
/// # Example
///
/// ```rust,no_run
/// use cocojson::coco::{CocoDataset, CocoWriter};
///
/// let writer = CocoWriter::new();
/// let dataset = CocoDataset::default();
/// writer.write_json(&dataset, "annotations.json")?;
/// # Ok::<(), cocojson::Error>(())
/// ```
pub struct CocoWriter {
    options: CocoWriteOptions,
}

impl CocoWriter {
    /// Create a new COCO writer with default options.
    pub fn new() -> Self {
        Self {
            options: CocoWriteOptions::default(),
        }
    }

    /// Create a new COCO writer with custom options.
    pub fn with_options(options: CocoWriteOptions) -> Self {
        Self { options }
    }

    /// Write COCO dataset to a JSON file, replacing any existing file.
    ///
    /// The document is written to a temporary file in the target directory
    /// and persisted over `path`, so an interrupted run never leaves a
    /// truncated file at `path`.
    ///
    /// # Arguments
    /// * `dataset` - The COCO dataset to write
    /// * `path` - Output file path
    pub fn write_json<P: AsRef<Path>>(&self, dataset: &CocoDataset, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let staging = NamedTempFile::new_in(dir)?;
        self.write_to(dataset, staging.as_file())?;
        staging.persist(path).map_err(std::io::Error::from)?;
        Ok(())
    }

    fn write_to<W: Write>(&self, dataset: &CocoDataset, out: W) -> Result<(), Error> {
        let mut writer = BufWriter::with_capacity(64 * 1024, out);

        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, dataset)?;
        } else {
            serde_json::to_writer(&mut writer, dataset)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for CocoWriter {
    fn default() -> Self {
        Self::new()
    }
}
