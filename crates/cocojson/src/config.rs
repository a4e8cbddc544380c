// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Layered configuration for hard-example mining.
//!
//! Values are merged in this order, later sources winning:
//!
//! 1. built-in defaults
//! 2. a TOML/JSON/YAML config file: an explicit path, which must exist, or
//!    the optional `cocojson.toml` in the user config directory
//! 3. `COCOJSON_*` environment variables, e.g. `COCOJSON_IOU_THRESHOLD=0.5`
//!
//! Command-line flags are applied on top by the caller.

use crate::{
    Error,
    mining::{BoxFormat, Thresholds},
};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "COCOJSON";

/// File name looked up in the user config directory.
pub const CONFIG_FILE_NAME: &str = "cocojson.toml";

/// Default cap on records per category.
pub const DEFAULT_MAX_COPY_NUM: usize = 1000;

/// Settings for `compare-predictions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub iou_threshold: f64,
    pub ideal_iou_threshold: f64,
    pub minimum_score_threshold: f64,
    pub false_positive_score_threshold: f64,
    /// Records kept per category before materialization, 0 for no cap.
    pub max_copy_num: usize,
    pub bbox_format: BoxFormat,
    /// TrueType font for score labels.
    pub font: Option<PathBuf>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            iou_threshold: thresholds.iou_threshold,
            ideal_iou_threshold: thresholds.ideal_iou_threshold,
            minimum_score_threshold: thresholds.minimum_score_threshold,
            false_positive_score_threshold: thresholds.false_positive_score_threshold,
            max_copy_num: DEFAULT_MAX_COPY_NUM,
            bbox_format: BoxFormat::default(),
            font: None,
        }
    }
}

/// Path of the optional per-user config file.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "cocojson", "cocojson").map(|d| d.config_dir().join(CONFIG_FILE_NAME))
}

impl MiningConfig {
    /// Load from `path` (or the per-user file) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::from_sources(path, default_config_path().as_deref(), None)
    }

    /// Load from explicit sources.
    ///
    /// `path` must exist when given. `fallback` is only consulted without
    /// `path` and may be absent. `env` replaces the process environment when
    /// provided. Thresholds are not validated here; call [`Self::validate`]
    /// once command-line overrides are in place.
    pub fn from_sources(
        path: Option<&Path>,
        fallback: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, Error> {
        let defaults = MiningConfig::default();
        let mut builder = Config::builder()
            .set_default("iou_threshold", defaults.iou_threshold)?
            .set_default("ideal_iou_threshold", defaults.ideal_iou_threshold)?
            .set_default("minimum_score_threshold", defaults.minimum_score_threshold)?
            .set_default(
                "false_positive_score_threshold",
                defaults.false_positive_score_threshold,
            )?
            .set_default("max_copy_num", defaults.max_copy_num as u64)?
            .set_default("bbox_format", defaults.bbox_format.to_string())?;

        match (path, fallback) {
            (Some(path), _) => {
                if !path.is_file() {
                    return Err(Error::MissingFile(path.to_path_buf()));
                }
                debug!("Loading config from {}", path.display());
                builder = builder.add_source(File::from(path).required(true));
            }
            (None, Some(fallback)) => {
                debug!("Looking for optional config at {}", fallback.display());
                builder = builder.add_source(File::from(fallback).required(false));
            }
            (None, None) => {}
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            iou_threshold: self.iou_threshold,
            ideal_iou_threshold: self.ideal_iou_threshold,
            minimum_score_threshold: self.minimum_score_threshold,
            false_positive_score_threshold: self.false_positive_score_threshold,
        }
    }

    /// Check the thresholds after all overrides are applied.
    pub fn validate(&self) -> Result<(), Error> {
        self.thresholds().validate()
    }
}
