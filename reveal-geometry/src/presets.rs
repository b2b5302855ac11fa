// SPDX-License-Identifier: MIT
//! # Output Canvas Presets
//!
//! Every stage is resized to one fixed canvas regardless of the crop window's
//! aspect ratio. The game client draws the image in a 300×200 container, so the
//! default renders at twice that for high-density displays.

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// Number of bytes for a tightly packed buffer with `channels` bytes per pixel.
    pub fn byte_len(self, channels: usize) -> usize {
        (self.w as usize) * (self.h as usize) * channels
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Fixed output canvases for rendered stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CanvasPreset {
    /// 300×200, one output pixel per client CSS pixel
    #[clap(name = "standard")]
    Standard,
    /// 600×400, 2× the client container for high-density screens
    #[default]
    #[clap(name = "retina")]
    Retina,
}

impl CanvasPreset {
    pub fn size(self) -> Size {
        match self {
            CanvasPreset::Standard => Size::new(300, 200),
            CanvasPreset::Retina => Size::new(600, 400),
        }
    }
}
