// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # cocojson
//!
//! Curation tools for object-detection datasets in the COCO JSON format,
//! built around a prediction-evaluation and hard-example-mining engine.
//!
//! ## Features
//!
//! - **COCO I/O**: typed reader and writer that keep unknown fields intact
//! - **Hard-example mining**: greedy box matching and four error categories
//!   (high-score false positives, low-score misses, poor localization,
//!   low-confidence matches)
//! - **Evidence output**: raw copies, annotated visualizations and reduced
//!   COCO files per category
//! - **Dataset tools**: drop empty, missing or already-listed images, select
//!   by score, complete partial documents
//! - **Layered configuration**: defaults, config file and `COCOJSON_*`
//!   environment variables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cocojson::{Error, coco::CocoReader, config::MiningConfig, mining};
//!
//! fn main() -> Result<(), Error> {
//!     let config = MiningConfig::load(None)?;
//!     config.validate()?;
//!     let reader = CocoReader::new();
//!     let gt = reader.read_json("gt.json")?;
//!     let pred = reader.read_json("pred.json")?;
//!
//!     let analysis = mining::analyze(&gt, &pred, &config.thresholds(), config.bbox_format)?;
//!     println!("{}", mining::Report::from_analysis(&analysis, &gt));
//!     Ok(())
//! }
//! ```

pub mod coco;
pub mod config;
pub mod mining;
pub mod store;

mod error;

pub use crate::error::Error;
