// SPDX-License-Identifier: MIT
//! # reveal-geometry: Crop Geometry for Progressive-Reveal Puzzles
//!
//! A "guess the photo" game shows a source image zoomed in around a focal point,
//! then zooms out a little after every missed guess. The client does this with a
//! CSS `transform: scale(N)` and a `transform-origin`. This crate computes the
//! equivalent source-pixel rectangle for each discrete stage so the frames can be
//! pre-rendered server side.
//!
//! ## Key Components
//!
//! - [`origin`]: Parse `transform-origin` strings into normalized fractions
//! - [`stages`]: Zoom factor for each of the six reveal stages
//! - [`window`]: Map (image size, origin, scale) to a clamped crop window
//! - [`cpu`]: Stretch resize of RGB8 buffers using fast_image_resize
//! - [`presets`]: Output canvas sizes
//!
//! ## Usage Example
//!
//! ```rust
//! use reveal_geometry::origin::parse_origin;
//! use reveal_geometry::stages::{StageIndex, scale_for_stage};
//! use reveal_geometry::window::resolve;
//!
//! let origin = parse_origin("center center");
//! let scale = scale_for_stage(StageIndex::FIRST, 5.0);
//! let window = resolve(1200, 800, origin, scale);
//! assert_eq!((window.x, window.y, window.width, window.height), (480.0, 320.0, 240.0, 160.0));
//! ```

pub mod cpu;
pub mod origin;
pub mod presets;
pub mod stages;
pub mod window;
