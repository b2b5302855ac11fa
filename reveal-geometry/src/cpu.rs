// SPDX-License-Identifier: MIT
// CPU resize built on fast_image_resize (SIMD-accelerated).
// RGB8 in → RGB8 out, stretched to the caller's canvas, direct write into dst.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeOptions, Resizer};

use crate::presets::Size;

/// Bytes per RGB8 pixel.
pub const RGB_CHANNELS: usize = 3;

#[derive(Debug)]
pub enum ScaleError {
    EmptyImage,
    BufferTooSmall,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError {
    fn from(e: fir::ResizeError) -> Self {
        Self::Fir(e)
    }
}

impl From<fir::ImageBufferError> for ScaleError {
    fn from(e: fir::ImageBufferError) -> Self {
        Self::ImageBuf(e)
    }
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::EmptyImage => write!(f, "Source or destination has a zero dimension"),
            ScaleError::BufferTooSmall => write!(f, "Buffer too small for the declared size"),
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Stretch a tightly packed RGB8 image to exactly `out`, ignoring aspect ratio.
/// `dst` must hold at least `out.w * out.h * 3` bytes.
pub fn resize_rgb_cpu(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    src: Size,
    out: Size,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    if src.is_empty() || out.is_empty() {
        return Err(ScaleError::EmptyImage);
    }
    if src_rgb.len() < src.byte_len(RGB_CHANNELS) {
        return Err(ScaleError::BufferTooSmall);
    }
    let dst_len = out.byte_len(RGB_CHANNELS);
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(
        src.w,
        src.h,
        &src_rgb[..src.byte_len(RGB_CHANNELS)],
    )?;
    let mut dst_image = TypedImage::<U8x3>::from_buffer(out.w, out.h, &mut dst[..dst_len])?;

    // Lanczos3 convolution (the crate default); the 1:1 case is a plain copy.
    let opts = ResizeOptions::new();
    resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?;
    Ok(())
}

/// Convenience wrapper that allocates the destination buffer.
pub fn resize_rgb_to_vec(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    src: Size,
    out: Size,
) -> Result<Vec<u8>, ScaleError> {
    let mut dst = vec![0u8; out.byte_len(RGB_CHANNELS)];
    resize_rgb_cpu(resizer, src_rgb, src, out, &mut dst)?;
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(size: Size, rgb: [u8; 3]) -> Vec<u8> {
        rgb.iter().copied().cycle().take(size.byte_len(RGB_CHANNELS)).collect()
    }

    #[test]
    fn test_stretch_preserves_solid_color() {
        let src_size = Size::new(40, 10);
        let src = solid(src_size, [200, 30, 90]);
        let mut resizer = Resizer::new();
        let out = resize_rgb_to_vec(&mut resizer, &src, src_size, Size::new(30, 20)).unwrap();
        assert_eq!(out.len(), 30 * 20 * 3);
        for px in out.chunks_exact(3) {
            for (got, want) in px.iter().zip([200u8, 30, 90]) {
                assert!(got.abs_diff(want) <= 1, "{px:?}");
            }
        }
    }

    #[test]
    fn test_rejects_empty_sizes() {
        let mut resizer = Resizer::new();
        let err = resize_rgb_to_vec(&mut resizer, &[], Size::new(0, 4), Size::new(2, 2));
        assert!(matches!(err, Err(ScaleError::EmptyImage)));
    }

    #[test]
    fn test_rejects_short_source() {
        let mut resizer = Resizer::new();
        let err = resize_rgb_to_vec(&mut resizer, &[0u8; 5], Size::new(2, 2), Size::new(2, 2));
        assert!(matches!(err, Err(ScaleError::BufferTooSmall)));
    }
}
