// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Image storage abstraction for evidence output.
//!
//! Every filesystem side effect of the curation tools on image files goes
//! through the [`ImageStore`] trait, so the mining pipeline can be exercised
//! against an in-memory backend.
//!
//! # Storage Implementations
//!
//! - [`FsImageStore`]: reads and writes real files, draws overlays with
//!   `imageproc`
//! - [`MemoryImageStore`]: records calls, no filesystem access
//!
//! # Examples
//!
//! ```rust,no_run
//! use cocojson::store::{FsImageStore, ImageStore, Overlay};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), cocojson::Error> {
//! let store = FsImageStore::new();
//! store.copy(Path::new("images/0001.jpg"), Path::new("out/raw/0001.jpg"))?;
//! store.visualize(
//!     Path::new("images/0001.jpg"),
//!     Path::new("out/vis/0001.jpg"),
//!     &Overlay::default(),
//! )?;
//! # Ok(())
//! # }
//! ```

use crate::{
    Error,
    coco::CocoAnnotation,
    mining::geometry::{BoxFormat, BoxXyxy, to_xyxy},
};
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};
use log::{debug, warn};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

/// Ground-truth box colour.
pub const GT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Prediction box and score label colour.
pub const PRED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Outline width in pixels.
pub const LINE_WIDTH: u32 = 2;
/// Score label height in pixels.
const LABEL_SCALE: f32 = 12.0;

/// Fonts tried for score labels when none is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A prediction box with its optional confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredBox {
    pub bbox: BoxXyxy,
    pub score: Option<f64>,
}

/// Boxes drawn over one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub ground_truth: Vec<BoxXyxy>,
    pub predictions: Vec<ScoredBox>,
}

impl Overlay {
    /// Build an overlay from one image's ground-truth and prediction
    /// annotations.
    pub fn from_annotations(
        gt: &[&CocoAnnotation],
        pred: &[&CocoAnnotation],
        format: BoxFormat,
    ) -> Self {
        Self {
            ground_truth: gt.iter().map(|a| to_xyxy(&a.bbox, format)).collect(),
            predictions: pred
                .iter()
                .map(|a| ScoredBox {
                    bbox: to_xyxy(&a.bbox, format),
                    score: a.score,
                })
                .collect(),
        }
    }
}

/// Capability for copying, annotating and checking image files.
pub trait ImageStore: Send + Sync {
    /// Copy `src` to `dst` verbatim, creating parent directories.
    fn copy(&self, src: &Path, dst: &Path) -> Result<(), Error>;

    /// Decode `src`, draw `overlay` on it and save it to `dst`, creating
    /// parent directories. The output encoding follows the `dst` extension.
    fn visualize(&self, src: &Path, dst: &Path, overlay: &Overlay) -> Result<(), Error>;

    /// Succeed if `path` exists and decodes as an image.
    fn verify(&self, path: &Path) -> Result<(), Error>;
}

fn ensure_parent(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Filesystem-backed image store.
///
/// Score labels need a TrueType font. Without one, boxes are still drawn and
/// labels are skipped; the first skipped label logs a warning.
pub struct FsImageStore {
    font: Option<FontVec>,
    font_warned: AtomicBool,
}

impl FsImageStore {
    /// Create a store using the first readable system font, if any.
    pub fn new() -> Self {
        let font = SYSTEM_FONTS
            .iter()
            .map(Path::new)
            .filter(|p| p.is_file())
            .find_map(|p| match load_font(p) {
                Ok(font) => {
                    debug!("Using label font {}", p.display());
                    Some(font)
                }
                Err(err) => {
                    debug!("Skipping font {}: {}", p.display(), err);
                    None
                }
            });
        Self::with_font(font)
    }

    /// Create a store that labels scores with the font at `path`.
    pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        let font = load_font(path)?;
        debug!("Using label font {}", path.display());
        Ok(Self::with_font(Some(font)))
    }

    /// Create a store that never draws score labels.
    pub fn without_font() -> Self {
        Self::with_font(None)
    }

    fn with_font(font: Option<FontVec>) -> Self {
        Self {
            font,
            font_warned: AtomicBool::new(false),
        }
    }

    /// Whether score labels will be drawn.
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw(&self, img: &mut RgbImage, overlay: &Overlay) {
        for bbox in &overlay.ground_truth {
            if let Some(rect) = canvas_rect(img, bbox) {
                draw_box(img, rect, GT_COLOR);
            }
        }

        for pred in &overlay.predictions {
            let Some(rect) = canvas_rect(img, &pred.bbox) else {
                continue;
            };
            draw_box(img, rect, PRED_COLOR);

            let Some(score) = pred.score else {
                continue;
            };
            match &self.font {
                Some(font) => {
                    let x = rect.x.max(0);
                    let y = rect.y.saturating_sub(LABEL_SCALE as i32).max(0);
                    draw_text_mut(
                        img,
                        PRED_COLOR,
                        x,
                        y,
                        PxScale::from(LABEL_SCALE),
                        font,
                        &format!("{:.2}", score),
                    );
                }
                None => {
                    if !self.font_warned.swap(true, Ordering::Relaxed) {
                        warn!("No font available, score labels are not drawn");
                    }
                }
            }
        }
    }
}

impl Default for FsImageStore {
    fn default() -> Self {
        Self::new()
    }
}

fn load_font(path: &Path) -> Result<FontVec, Error> {
    let bytes = std::fs::read(path)?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| Error::FontError(format!("{}: {}", path.display(), e)))
}

/// Pixel extent of a box on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CanvasRect {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

/// Round `bbox` to pixels, clamping each edge to at most `LINE_WIDTH`
/// outside the image so edges beyond the border stay invisible. `None` when
/// the box lies entirely off the canvas.
fn canvas_rect(img: &RgbImage, bbox: &BoxXyxy) -> Option<CanvasRect> {
    let (width, height) = (img.width() as f64, img.height() as f64);
    if bbox.x2 < 0.0 || bbox.y2 < 0.0 || bbox.x1 >= width || bbox.y1 >= height {
        return None;
    }

    let margin = LINE_WIDTH as f64;
    let x1 = bbox.x1.round().clamp(-margin, width + margin);
    let y1 = bbox.y1.round().clamp(-margin, height + margin);
    let x2 = bbox.x2.round().clamp(-margin, width + margin);
    let y2 = bbox.y2.round().clamp(-margin, height + margin);
    Some(CanvasRect {
        x: x1 as i32,
        y: y1 as i32,
        width: (x2 - x1).max(0.0) as u32,
        height: (y2 - y1).max(0.0) as u32,
    })
}

/// Outline `rect` with a `LINE_WIDTH` stroke drawn inwards.
fn draw_box(img: &mut RgbImage, rect: CanvasRect, color: Rgb<u8>) {
    for inset in 0..LINE_WIDTH {
        let (Some(w), Some(h)) = (
            rect.width.checked_sub(2 * inset),
            rect.height.checked_sub(2 * inset),
        ) else {
            break;
        };
        if w == 0 || h == 0 {
            break;
        }
        let offset = inset as i32;
        draw_hollow_rect_mut(
            img,
            Rect::at(rect.x.saturating_add(offset), rect.y.saturating_add(offset)).of_size(w, h),
            color,
        );
    }
}

impl ImageStore for FsImageStore {
    fn copy(&self, src: &Path, dst: &Path) -> Result<(), Error> {
        if !src.is_file() {
            return Err(Error::MissingFile(src.to_path_buf()));
        }
        ensure_parent(dst)?;
        std::fs::copy(src, dst)?;
        debug!("Copied {} to {}", src.display(), dst.display());
        Ok(())
    }

    fn visualize(&self, src: &Path, dst: &Path, overlay: &Overlay) -> Result<(), Error> {
        if !src.is_file() {
            return Err(Error::MissingFile(src.to_path_buf()));
        }
        let mut img = image::open(src)?.to_rgb8();
        self.draw(&mut img, overlay);
        ensure_parent(dst)?;
        img.save(dst)?;
        debug!("Visualized {} to {}", src.display(), dst.display());
        Ok(())
    }

    fn verify(&self, path: &Path) -> Result<(), Error> {
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        image::open(path)?;
        Ok(())
    }
}

/// A call recorded by [`MemoryImageStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Copy { src: PathBuf, dst: PathBuf },
    Visualize {
        src: PathBuf,
        dst: PathBuf,
        overlay: Overlay,
    },
    Verify { path: PathBuf },
}

/// In-memory image store (no filesystem access).
///
/// Source files must be registered with [`MemoryImageStore::with_file`];
/// operations on anything else fail with [`Error::MissingFile`]. Successful
/// copies and visualizations register their destination.
///
/// ```rust
/// use cocojson::store::{ImageStore, MemoryImageStore};
/// use std::path::Path;
///
/// let store = MemoryImageStore::new().with_file("in/a.jpg");
/// store.copy(Path::new("in/a.jpg"), Path::new("out/a.jpg")).unwrap();
/// assert!(store.contains(Path::new("out/a.jpg")));
/// assert!(store.copy(Path::new("in/b.jpg"), Path::new("out/b.jpg")).is_err());
/// ```
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    files: RwLock<HashSet<PathBuf>>,
    undecodable: HashSet<PathBuf>,
    calls: RwLock<Vec<StoreCall>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing source file.
    pub fn with_file<P: Into<PathBuf>>(self, path: P) -> Self {
        if let Ok(mut files) = self.files.write() {
            files.insert(path.into());
        }
        self
    }

    /// Register a file that exists but fails to decode.
    pub fn with_undecodable<P: Into<PathBuf>>(mut self, path: P) -> Self {
        let path = path.into();
        self.undecodable.insert(path.clone());
        self.with_file(path)
    }

    /// Whether `path` is currently present.
    pub fn contains(&self, path: &Path) -> bool {
        self.files
            .read()
            .map(|files| files.contains(path))
            .unwrap_or(false)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: StoreCall) -> Result<(), Error> {
        self.calls
            .write()
            .map_err(|e| lock_error("calls", e))?
            .push(call);
        Ok(())
    }

    fn require(&self, path: &Path) -> Result<(), Error> {
        if self.contains(path) {
            Ok(())
        } else {
            Err(Error::MissingFile(path.to_path_buf()))
        }
    }

    fn insert(&self, path: &Path) -> Result<(), Error> {
        self.files
            .write()
            .map_err(|e| lock_error("files", e))?
            .insert(path.to_path_buf());
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<(), Error> {
        self.require(path)?;
        if self.undecodable.contains(path) {
            return Err(Error::ImageError(image::ImageError::IoError(
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("cannot decode {}", path.display()),
                ),
            )));
        }
        Ok(())
    }
}

fn lock_error<E: std::fmt::Display>(what: &str, err: E) -> Error {
    Error::IoError(std::io::Error::other(format!(
        "Failed to acquire {} lock: {}",
        what, err
    )))
}

impl ImageStore for MemoryImageStore {
    fn copy(&self, src: &Path, dst: &Path) -> Result<(), Error> {
        self.record(StoreCall::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        })?;
        self.require(src)?;
        self.insert(dst)
    }

    fn visualize(&self, src: &Path, dst: &Path, overlay: &Overlay) -> Result<(), Error> {
        self.record(StoreCall::Visualize {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            overlay: overlay.clone(),
        })?;
        self.decode(src)?;
        self.insert(dst)
    }

    fn verify(&self, path: &Path) -> Result<(), Error> {
        self.record(StoreCall::Verify {
            path: path.to_path_buf(),
        })?;
        self.decode(path)
    }
}
