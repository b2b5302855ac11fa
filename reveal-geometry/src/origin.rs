// SPDX-License-Identifier: MIT
//! # Transform-Origin Parsing
//!
//! Turns an authored focal-point string such as `"35% 60%"`, `"center center"` or
//! `"top left"` into fractional coordinates. Parsing is total: every input yields
//! two values in `[0, 1]`, with anything unrecognized falling back to the midpoint.

/// Focal point as fractions of the image width and height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedOrigin {
    pub x: f64,
    pub y: f64,
}

impl NormalizedOrigin {
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };

    /// Build an origin, clamping both components into the unit interval.
    /// Non-finite components collapse to the midpoint.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }
}

impl Default for NormalizedOrigin {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Default origin string used when a game row has none.
pub const DEFAULT_ORIGIN: &str = "50% 50%";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// Parse a transform-origin string.
///
/// Only the first two whitespace-separated tokens are read. A missing token is
/// treated as `center`. Keywords only apply on their own axis (`left`/`right` on x,
/// `top`/`bottom` on y); on the other axis they resolve to 0.5. The one exception is
/// a vertical keyword followed by a horizontal one (`"top left"`), which is read in
/// swapped order the same way a browser accepts it.
pub fn parse_origin(origin: &str) -> NormalizedOrigin {
    let lowered = origin.to_lowercase();
    let mut tokens = lowered.split_whitespace();
    let first = tokens.next().unwrap_or("center");
    let second = tokens.next().unwrap_or("center");

    let (x_token, y_token) = if is_vertical_keyword(first) && is_horizontal_keyword(second) {
        (second, first)
    } else {
        (first, second)
    };

    NormalizedOrigin::new(
        parse_dimension(x_token, Axis::X),
        parse_dimension(y_token, Axis::Y),
    )
}

fn parse_dimension(token: &str, axis: Axis) -> f64 {
    if token.contains('%') {
        return leading_number(token).map_or(0.5, |v| v / 100.0);
    }
    match (token, axis) {
        ("left", Axis::X) | ("top", Axis::Y) => 0.0,
        ("right", Axis::X) | ("bottom", Axis::Y) => 1.0,
        _ => 0.5,
    }
}

fn is_vertical_keyword(token: &str) -> bool {
    matches!(token, "top" | "bottom")
}

fn is_horizontal_keyword(token: &str) -> bool {
    matches!(token, "left" | "right")
}

/// Longest numeric prefix of `token`, e.g. `"37.5%"` → 37.5, `"-3px%"` → -3.
fn leading_number(token: &str) -> Option<f64> {
    let bytes = token.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    token[..end].parse::<f64>().ok()
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 }
}
