// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::path::PathBuf;

/// Error type for COCO dataset curation and hard-example mining.
///
/// Structural problems (missing inputs, malformed JSON, bad configuration)
/// surface through this type and abort a run. Per-image failures during
/// evidence materialization are also expressed with it, but the
/// materializer logs and contains them instead of propagating.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error, including a document
    /// missing its required `images` or `annotations` keys.
    JsonError(serde_json::Error),
    /// Image decoding or encoding error.
    ImageError(image::ImageError),
    /// A required input file does not exist.
    MissingFile(PathBuf),
    /// Unsupported bounding box format tag.
    InvalidFormat(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
    /// Inconsistent COCO content.
    CocoError(String),
    /// The font used for score labels could not be loaded.
    FontError(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::ImageError(e) => write!(f, "Image error: {}", e),
            Error::MissingFile(p) => write!(f, "File not found: {}", p.display()),
            Error::InvalidFormat(s) => write!(f, "Invalid bbox format: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
            Error::CocoError(s) => write!(f, "COCO error: {}", s),
            Error::FontError(s) => write!(f, "Font error: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::ImageError(e) => Some(e),
            _ => None,
        }
    }
}
