// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Structural repair of incomplete COCO documents.
//!
//! Works on the raw JSON value so documents that would not deserialize into
//! [`CocoDataset`] can still be loaded. Missing sections and fields are
//! filled with neutral defaults; ids are never renumbered.

use super::types::CocoDataset;
use crate::Error;
use log::info;
use serde_json::{Map, Value, json};

/// Top-level sections every completed document carries.
pub const REQUIRED_SECTIONS: [&str; 5] = ["info", "licenses", "images", "annotations", "categories"];

/// Entries touched in one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionCompletion {
    /// Entries that lacked at least one required field.
    pub filled: usize,
    /// Entries with all fields present but a placeholder value corrected.
    pub fixed: usize,
}

/// What [`complete_document`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionReport {
    pub added_sections: Vec<&'static str>,
    pub images: SectionCompletion,
    pub annotations: SectionCompletion,
    pub categories: SectionCompletion,
}

impl CompletionReport {
    pub fn is_unchanged(&self) -> bool {
        self.added_sections.is_empty()
            && self.images == SectionCompletion::default()
            && self.annotations == SectionCompletion::default()
            && self.categories == SectionCompletion::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryChange {
    Unchanged,
    Fixed,
    Filled,
}

impl SectionCompletion {
    fn record(&mut self, change: EntryChange) {
        match change {
            EntryChange::Unchanged => {}
            EntryChange::Fixed => self.fixed += 1,
            EntryChange::Filled => self.filled += 1,
        }
    }
}

/// Insert `value` under `key` when absent. Returns whether it was inserted.
fn fill(entry: &mut Map<String, Value>, key: &str, value: Value) -> bool {
    if entry.contains_key(key) {
        return false;
    }
    entry.insert(key.to_string(), value);
    true
}

fn fill_all(entry: &mut Map<String, Value>, defaults: &[(&str, Value)]) -> bool {
    defaults
        .iter()
        .fold(false, |missing, (key, value)| fill(entry, key, value.clone()) | missing)
}

fn default_section(name: &str) -> Value {
    match name {
        "info" => json!({
            "description": "",
            "url": "",
            "version": "",
            "year": 0,
            "contributor": "",
            "date_created": "",
        }),
        _ => json!([]),
    }
}

fn complete_image(image: &mut Map<String, Value>) -> EntryChange {
    let missing = fill_all(
        image,
        &[
            ("file_name", json!("unknown.jpg")),
            ("height", json!(0)),
            ("width", json!(0)),
            ("id", json!(0)),
        ],
    );
    if missing {
        EntryChange::Filled
    } else {
        EntryChange::Unchanged
    }
}

/// `w * h` of a well-formed, non-negative `bbox`.
fn bbox_area(annotation: &Map<String, Value>) -> Option<f64> {
    match annotation.get("bbox")?.as_array()?.as_slice() {
        [_, _, w, h] => {
            let (w, h) = (w.as_f64()?, h.as_f64()?);
            (w >= 0.0 && h >= 0.0).then_some(w * h)
        }
        _ => None,
    }
}

fn complete_annotation(annotation: &mut Map<String, Value>) -> EntryChange {
    let missing = fill_all(
        annotation,
        &[
            ("id", json!(0)),
            ("image_id", json!(0)),
            ("category_id", json!(0)),
            ("bbox", json!([0, 0, 0, 0])),
            ("area", json!(0)),
            ("iscrowd", json!(0)),
        ],
    );
    let mut changed = false;

    let area = annotation.get("area").and_then(Value::as_f64);
    if area.is_none_or(|a| a == 0.0)
        && let Some(computed) = bbox_area(annotation)
        && area != Some(computed)
    {
        annotation.insert("area".to_string(), json!(computed));
        changed = true;
    }

    let missing = match annotation.get("segmentation").map(Value::is_null) {
        None => fill(annotation, "segmentation", json!([])) | missing,
        Some(true) => {
            annotation.insert("segmentation".to_string(), json!([]));
            changed = true;
            missing
        }
        Some(false) => missing,
    };

    match (missing, changed) {
        (true, _) => EntryChange::Filled,
        (false, true) => EntryChange::Fixed,
        (false, false) => EntryChange::Unchanged,
    }
}

fn complete_category(category: &mut Map<String, Value>) -> EntryChange {
    let missing = fill_all(
        category,
        &[
            ("id", json!(0)),
            ("name", json!("unknown")),
            ("supercategory", json!("unknown")),
        ],
    );
    if missing {
        EntryChange::Filled
    } else {
        EntryChange::Unchanged
    }
}

fn complete_license(license: &mut Map<String, Value>) -> EntryChange {
    if fill(license, "id", json!(0)) {
        EntryChange::Filled
    } else {
        EntryChange::Unchanged
    }
}

fn complete_section(
    document: &mut Map<String, Value>,
    name: &str,
    complete: fn(&mut Map<String, Value>) -> EntryChange,
) -> Result<SectionCompletion, Error> {
    let mut completion = SectionCompletion::default();
    let Some(entries) = document.get_mut(name) else {
        return Ok(completion);
    };
    let entries = entries
        .as_array_mut()
        .ok_or_else(|| Error::CocoError(format!("'{}' must be an array", name)))?;

    for (i, entry) in entries.iter_mut().enumerate() {
        let entry = entry
            .as_object_mut()
            .ok_or_else(|| Error::CocoError(format!("{}[{}] is not an object", name, i)))?;
        completion.record(complete(entry));
    }
    Ok(completion)
}

/// Fill missing sections and fields of a COCO document in place.
///
/// Absent or `null` top-level sections get an empty default. Images,
/// annotations, categories and licenses get placeholder values for missing
/// required fields. An annotation whose `area` is missing or zero takes
/// `w * h` from its box, and a missing or `null` `segmentation` becomes an
/// empty list. Existing values, including duplicate or zero ids, are kept.
pub fn complete_document(document: &mut Value) -> Result<CompletionReport, Error> {
    let document = document
        .as_object_mut()
        .ok_or_else(|| Error::CocoError("COCO document must be a JSON object".to_string()))?;

    let mut report = CompletionReport::default();
    for name in REQUIRED_SECTIONS {
        if document.get(name).is_none_or(Value::is_null) {
            document.insert(name.to_string(), default_section(name));
            report.added_sections.push(name);
        }
    }

    report.images = complete_section(document, "images", complete_image)?;
    report.annotations = complete_section(document, "annotations", complete_annotation)?;
    report.categories = complete_section(document, "categories", complete_category)?;
    complete_section(document, "licenses", complete_license)?;

    if !report.added_sections.is_empty() {
        info!("Added missing sections: {}", report.added_sections.join(", "));
    }
    info!(
        "Images: {} fixed, {} filled; annotations: {} fixed, {} filled; categories: {} fixed, {} filled",
        report.images.fixed,
        report.images.filled,
        report.annotations.fixed,
        report.annotations.filled,
        report.categories.fixed,
        report.categories.filled
    );
    Ok(report)
}

/// Complete `document` and convert it to a typed dataset.
pub fn complete_dataset(mut document: Value) -> Result<(CocoDataset, CompletionReport), Error> {
    let report = complete_document(&mut document)?;
    let dataset = serde_json::from_value(document)?;
    Ok((dataset, report))
}
