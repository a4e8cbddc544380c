// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Box format conversion and Intersection over Union.

use crate::Error;
use serde::{Deserialize, Serialize};

/// Layout of the four numbers stored in a COCO `bbox` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxFormat {
    /// `[x, y, width, height]` with the top-left corner, the COCO default.
    #[default]
    Xywh,
    /// `[x1, y1, x2, y2]` corner form.
    Xyxy,
}

impl std::fmt::Display for BoxFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            BoxFormat::Xywh => "xywh",
            BoxFormat::Xyxy => "xyxy",
        };
        write!(f, "{}", value)
    }
}

impl TryFrom<&str> for BoxFormat {
    type Error = crate::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_ascii_lowercase().as_str() {
            "xywh" => Ok(BoxFormat::Xywh),
            "xyxy" => Ok(BoxFormat::Xyxy),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl std::str::FromStr for BoxFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

/// Axis-aligned box in corner form. All IoU math works on this layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxXyxy {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoxXyxy {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Signed area; negative for inverted boxes.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Convert a raw COCO `bbox` to corner form.
pub fn to_xyxy(bbox: &[f64; 4], format: BoxFormat) -> BoxXyxy {
    match format {
        BoxFormat::Xywh => BoxXyxy::new(bbox[0], bbox[1], bbox[0] + bbox[2], bbox[1] + bbox[3]),
        BoxFormat::Xyxy => BoxXyxy::new(bbox[0], bbox[1], bbox[2], bbox[3]),
    }
}

/// Intersection over Union of two corner-form boxes.
///
/// Returns `0.0` when the boxes do not overlap and when the union area is not
/// positive (degenerate input), so both cases read as "no similarity".
pub fn iou(a: &BoxXyxy, b: &BoxXyxy) -> f64 {
    let inter_x1 = a.x1.max(b.x1);
    let inter_y1 = a.y1.max(b.y1);
    let inter_x2 = a.x2.min(b.x2);
    let inter_y2 = a.y2.min(b.y2);

    if inter_x2 <= inter_x1 || inter_y2 <= inter_y1 {
        return 0.0;
    }

    let inter_area = (inter_x2 - inter_x1) * (inter_y2 - inter_y1);
    let union_area = a.area() + b.area() - inter_area;

    if union_area <= 0.0 {
        return 0.0;
    }

    inter_area / union_area
}

/// IoU of two raw COCO boxes interpreted with `format`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4], format: BoxFormat) -> f64 {
    iou(&to_xyxy(a, format), &to_xyxy(b, format))
}
