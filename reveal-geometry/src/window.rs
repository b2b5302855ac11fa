// SPDX-License-Identifier: MIT
//! # Crop Window Resolution
//!
//! With `transform: scale(s)` the client shows `1/s` of the image in each
//! direction, centered on the transform origin. This module computes that
//! rectangle in source pixels and pushes it back inside the image when the focal
//! point sits near an edge.
//!
//! Coordinates stay in `f64` until [`CropWindow::to_pixel_rect`] is called at
//! extraction time, so the two clamp passes never accumulate rounding error.

use crate::origin::NormalizedOrigin;

/// Visible region of the source image at one stage, in source pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropWindow {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer rectangle actually extracted from the source buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Compute the crop window for an image of `width × height` pixels.
///
/// A scale below 1 (or NaN/infinite) is treated as 1, and the visible extent is
/// additionally clamped to the image so the window can never exceed it.
pub fn resolve(width: u32, height: u32, origin: NormalizedOrigin, scale: f64) -> CropWindow {
    let scale = if scale.is_finite() { scale.max(1.0) } else { 1.0 };
    let (w, h) = (f64::from(width), f64::from(height));

    let visible_w = (w / scale).min(w);
    let visible_h = (h / scale).min(h);

    let x = clamp_axis(w * origin.x - visible_w / 2.0, visible_w, w);
    let y = clamp_axis(h * origin.y - visible_h / 2.0, visible_h, h);

    CropWindow {
        x,
        y,
        width: visible_w,
        height: visible_h,
    }
}

fn clamp_axis(start: f64, visible: f64, extent: f64) -> f64 {
    let mut start = start.max(0.0);
    if start + visible > extent {
        start = extent - visible;
    }
    start.max(0.0)
}

impl CropWindow {
    /// Round to whole pixels for an image of `width × height`.
    ///
    /// Offsets and extents are rounded independently (half away from zero), then
    /// the extent is trimmed so the rectangle stays inside the image and is at
    /// least one pixel on each side.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> PixelRect {
        let (x, w) = round_axis(self.x, self.width, width);
        let (y, h) = round_axis(self.y, self.height, height);
        PixelRect { x, y, w, h }
    }

    /// `true` when the window lies fully inside a `width × height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= f64::from(width) + 1e-9
            && self.y + self.height <= f64::from(height) + 1e-9
    }
}

fn round_axis(start: f64, len: f64, extent: u32) -> (u32, u32) {
    let extent = extent.max(1);
    let start = (start.round().max(0.0) as u32).min(extent - 1);
    let len = (len.round().max(1.0) as u32).min(extent - start);
    (start, len)
}
