//! Image loading and shape reconciliation.
//!
//! Images are `image::RgbImage` buffers: 8-bit RGB, (height, width, 3),
//! non-empty. Shapes are always spoken of as (height, width); the
//! (width, height) order of the `image` crate stays inside this module.

use crate::result::{FacefillError, FacefillResult};
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Requested comparison shape, given as (height, width)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSize {
    /// Rows
    pub height: u32,
    /// Columns
    pub width: u32,
}

impl TargetSize {
    /// Create a target size from (height, width)
    #[must_use]
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// (height, width) tuple
    #[must_use]
    pub const fn as_hw(self) -> (u32, u32) {
        (self.height, self.width)
    }

    /// Whether both dimensions are positive
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.height > 0 && self.width > 0
    }
}

impl std::fmt::Display for TargetSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} (h x w)", self.height, self.width)
    }
}

/// (height, width) of an image
#[must_use]
pub fn shape(img: &RgbImage) -> (u32, u32) {
    (img.height(), img.width())
}

/// Decode `path` (PNG or JPEG) and convert it to 8-bit RGB.
///
/// The format is sniffed from the file content, so a PNG named `.jpg` still
/// loads. Unreadable, undecodable and zero-sized files all surface as
/// [`FacefillError::Decode`].
pub fn load_rgb(path: &Path) -> FacefillResult<RgbImage> {
    let bytes = std::fs::read(path).map_err(|e| FacefillError::decode(path, e.to_string()))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| FacefillError::decode(path, e.to_string()))?
        .to_rgb8();

    if img.width() == 0 || img.height() == 0 {
        return Err(FacefillError::decode(path, "image has a zero dimension"));
    }
    Ok(img)
}

/// Bicubic resize to exactly `size`
#[must_use]
pub fn resize_to(img: &RgbImage, size: TargetSize) -> RgbImage {
    if shape(img) == size.as_hw() {
        return img.clone();
    }
    imageops::resize(img, size.width, size.height, FilterType::CatmullRom)
}

/// Keep the top-left `height` x `width` region
#[must_use]
pub fn crop_top_left(img: &RgbImage, height: u32, width: u32) -> RgbImage {
    imageops::crop_imm(img, 0, 0, width, height).to_image()
}

/// How a ground-truth/prediction pair was brought to a common shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconciliation {
    /// Shapes already matched and no resize was requested
    Unchanged,
    /// Both images were resized to the configured target
    Resized {
        /// Target (height, width)
        to: (u32, u32),
    },
    /// Shapes differed without a configured resize; both were cropped
    Cropped {
        /// Original ground-truth (height, width)
        gt: (u32, u32),
        /// Original prediction (height, width)
        pred: (u32, u32),
        /// Common (height, width) after cropping
        to: (u32, u32),
    },
}

/// Bring a pair to a common shape.
///
/// A configured `size` is authoritative: both images are resized and must
/// then agree, otherwise [`FacefillError::ResizeMismatch`] is returned. Only
/// when no resize was requested does a mismatch fall back to cropping both
/// images to the elementwise minimum, anchored top-left.
pub fn reconcile(
    gt: RgbImage,
    pred: RgbImage,
    size: Option<TargetSize>,
) -> FacefillResult<(RgbImage, RgbImage, Reconciliation)> {
    if let Some(target) = size {
        let gt = resize_to(&gt, target);
        let pred = resize_to(&pred, target);
        if shape(&gt) != shape(&pred) || shape(&gt) != target.as_hw() {
            return Err(FacefillError::ResizeMismatch {
                target: target.as_hw(),
                gt: shape(&gt),
                pred: shape(&pred),
            });
        }
        return Ok((gt, pred, Reconciliation::Resized { to: target.as_hw() }));
    }

    let (gt_shape, pred_shape) = (shape(&gt), shape(&pred));
    if gt_shape == pred_shape {
        return Ok((gt, pred, Reconciliation::Unchanged));
    }

    let to = (gt_shape.0.min(pred_shape.0), gt_shape.1.min(pred_shape.1));
    warn!(
        gt = ?gt_shape,
        pred = ?pred_shape,
        cropped = ?to,
        "shape mismatch without resize, cropping top-left"
    );
    let gt = crop_top_left(&gt, to.0, to.1);
    let pred = crop_top_left(&pred, to.0, to.1);
    Ok((
        gt,
        pred,
        Reconciliation::Cropped {
            gt: gt_shape,
            pred: pred_shape,
            to,
        },
    ))
}
