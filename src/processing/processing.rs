//! # Stage Rendering Pipeline
//!
//! Turns one decoded source image into the encoded artifact for a single reveal
//! stage:
//! 1. **Plan**: scale for the stage, then the clamped crop window
//! 2. **Extract**: copy the rounded window out of the shared source
//! 3. **Resize**: stretch the copy to the fixed output canvas
//! 4. **Encode**: baseline JPEG at a fixed quality
//!
//! The decoded source is shared read-only between stages (`&RgbImage` behind an
//! `Arc` in the session); every stage owns the sub-region it extracts, so stages
//! can run on separate threads without coordinating.

use bytes::Bytes;
use fast_image_resize::Resizer;
use image::{ExtendedColorType, RgbImage, codecs::jpeg::JpegEncoder, imageops};
use reveal_geometry::{
    cpu::resize_rgb_to_vec,
    origin::NormalizedOrigin,
    presets::{CanvasPreset, Size},
    stages::{StageIndex, scale_for_stage},
    window::{CropWindow, resolve},
};
use tracing::debug;

use crate::config::GameId;
use crate::error::{RevealError, RevealResult};

/// Content type of every stage artifact.
pub const ARTIFACT_CONTENT_TYPE: &str = "image/jpeg";

/// Canvas and encoder settings shared by all stages of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub target: Size,
    pub quality: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target: CanvasPreset::default().size(),
            quality: crate::config::config::DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Geometry for one stage, computed before any pixels are touched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StagePlan {
    pub stage: StageIndex,
    pub scale: f64,
    pub window: CropWindow,
}

/// Plans for all six stages of an image of `width × height`.
pub fn plan_stages(
    width: u32,
    height: u32,
    origin: NormalizedOrigin,
    max_zoom: f64,
) -> Vec<StagePlan> {
    StageIndex::all()
        .map(|stage| {
            let scale = scale_for_stage(stage, max_zoom);
            StagePlan {
                stage,
                scale,
                window: resolve(width, height, origin, scale),
            }
        })
        .collect()
}

/// Storage key of a stage artifact: `{gameId}/stage_{n}.jpg`.
pub fn artifact_key(game_id: &GameId, stage: StageIndex) -> String {
    format!("{}/stage_{}.jpg", game_id, stage)
}

/// Encoded image for one stage of one game.
#[derive(Clone, Debug)]
pub struct StageArtifact {
    pub game_id: GameId,
    pub stage: StageIndex,
    pub bytes: Bytes,
}

impl StageArtifact {
    pub fn key(&self) -> String {
        artifact_key(&self.game_id, self.stage)
    }
}

/// Decode fetched bytes into an RGB8 buffer.
pub fn decode_source(bytes: &[u8]) -> RevealResult<RgbImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| RevealError::decode(e.to_string()).with_operation("decode"))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(RevealError::decode("image has a zero dimension").with_operation("decode"));
    }
    Ok(decoded.to_rgb8())
}

/// Crops, resizes and encodes stages with fixed [`RenderOptions`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StagePipeline {
    options: RenderOptions,
}

impl StagePipeline {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Render the pixels visible through `window` as a JPEG of the target canvas.
    pub fn render(&self, source: &RgbImage, window: &CropWindow) -> RevealResult<Vec<u8>> {
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return Err(RevealError::decode("source image is empty"));
        }
        let expected = Size::new(width, height).byte_len(3);
        if source.as_raw().len() < expected {
            return Err(RevealError::decode(format!(
                "pixel buffer holds {} bytes, expected {}",
                source.as_raw().len(),
                expected
            )));
        }

        let rect = window.to_pixel_rect(width, height);
        let region = imageops::crop_imm(source, rect.x, rect.y, rect.w, rect.h).to_image();

        let target = self.options.target;
        let mut resizer = Resizer::new();
        let pixels = resize_rgb_to_vec(
            &mut resizer,
            region.as_raw(),
            Size::new(rect.w, rect.h),
            target,
        )
        .map_err(|e| RevealError::encode(None, format!("resize failed: {}", e)))?;

        encode_jpeg(&pixels, target, self.options.quality)
    }

    /// Render one planned stage into a tagged artifact.
    pub fn render_stage(
        &self,
        game_id: &GameId,
        source: &RgbImage,
        plan: &StagePlan,
    ) -> RevealResult<StageArtifact> {
        let bytes = self.render(source, &plan.window).map_err(|e| tag_stage(e, plan.stage))?;
        debug!(
            game_id = %game_id,
            stage = plan.stage.get(),
            scale = plan.scale,
            x = plan.window.x,
            y = plan.window.y,
            width = plan.window.width,
            height = plan.window.height,
            bytes = bytes.len(),
            "rendered stage"
        );
        Ok(StageArtifact {
            game_id: game_id.clone(),
            stage: plan.stage,
            bytes: Bytes::from(bytes),
        })
    }
}

fn encode_jpeg(pixels: &[u8], size: Size, quality: u8) -> RevealResult<Vec<u8>> {
    let mut out = Vec::with_capacity(size.byte_len(3) / 8);
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(pixels, size.w, size.h, ExtendedColorType::Rgb8)
        .map_err(|e| RevealError::encode(None, e.to_string()))?;
    Ok(out)
}

fn tag_stage(error: RevealError, stage: StageIndex) -> RevealError {
    let error = match error {
        RevealError::Encode {
            stage: None,
            reason,
            context,
        } => RevealError::Encode {
            stage: Some(stage.get()),
            reason,
            context,
        },
        other => other,
    };
    error.with_metadata("stage", stage.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use reveal_geometry::origin::parse_origin;
    use std::io::Cursor;

    /// Left half red, right half blue.
    fn split_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, _| {
            if x < w / 2 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        })
    }

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn mean_rgb(jpeg: &[u8]) -> (f64, f64, f64) {
        let img = image::load_from_memory(jpeg).unwrap().to_rgb8();
        let n = f64::from(img.width() * img.height());
        let (mut r, mut g, mut b) = (0.0, 0.0, 0.0);
        for p in img.pixels() {
            r += f64::from(p[0]);
            g += f64::from(p[1]);
            b += f64::from(p[2]);
        }
        (r / n, g / n, b / n)
    }

    #[test]
    fn test_plan_matches_centered_scenario() {
        let plans = plan_stages(1200, 800, parse_origin("center center"), 5.0);
        assert_eq!(plans.len(), 6);
        assert_eq!(plans[0].window, CropWindow { x: 480.0, y: 320.0, width: 240.0, height: 160.0 });
        assert_eq!(plans[5].scale, 1.0);
        assert_eq!(plans[5].window, CropWindow { x: 0.0, y: 0.0, width: 1200.0, height: 800.0 });
    }

    #[test]
    fn test_artifact_key_format() {
        let id = GameId::parse("abc-123").unwrap();
        assert_eq!(artifact_key(&id, StageIndex::FIRST), "abc-123/stage_0.jpg");
        assert_eq!(artifact_key(&id, StageIndex::REVEAL), "abc-123/stage_5.jpg");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_source(b"definitely not an image").unwrap_err();
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn test_decode_round_trip_dimensions() {
        let img = split_image(64, 32);
        let decoded = decode_source(&png_bytes(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (64, 32));
    }

    #[test]
    fn test_render_produces_canvas_sized_jpeg() {
        let source = split_image(200, 100);
        let pipeline = StagePipeline::default();
        let window = resolve(200, 100, NormalizedOrigin::CENTER, 1.0);
        let jpeg = pipeline.render(&source, &window).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let out = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((out.width(), out.height()), (600, 400));
    }

    #[test]
    fn test_render_shows_only_the_focal_region() {
        let source = split_image(400, 200);
        let pipeline = StagePipeline::new(RenderOptions { target: Size::new(60, 40), quality: 90 });

        let left = resolve(400, 200, parse_origin("left center"), 4.0);
        let (r, _, b) = mean_rgb(&pipeline.render(&source, &left).unwrap());
        assert!(r > 200.0 && b < 50.0, "left window should be red: r={r} b={b}");

        let right = resolve(400, 200, parse_origin("right center"), 4.0);
        let (r, _, b) = mean_rgb(&pipeline.render(&source, &right).unwrap());
        assert!(b > 200.0 && r < 50.0, "right window should be blue: r={r} b={b}");
    }

    #[test]
    fn test_render_leaves_source_untouched() {
        let source = split_image(120, 80);
        let before = source.clone();
        let pipeline = StagePipeline::default();
        for plan in plan_stages(120, 80, parse_origin("30% 70%"), 6.0) {
            pipeline.render(&source, &plan.window).unwrap();
        }
        assert_eq!(source, before);
    }

    #[test]
    fn test_render_stage_tags_artifact() {
        let source = split_image(90, 60);
        let id = GameId::parse("g1").unwrap();
        let plans = plan_stages(90, 60, NormalizedOrigin::CENTER, 3.0);
        let artifact = StagePipeline::default().render_stage(&id, &source, &plans[2]).unwrap();
        assert_eq!(artifact.key(), "g1/stage_2.jpg");
        assert!(!artifact.bytes.is_empty());
    }

    #[test]
    fn test_render_rejects_empty_source() {
        let source = RgbImage::new(0, 0);
        let window = CropWindow { x: 0.0, y: 0.0, width: 1.0, height: 1.0 };
        let err = StagePipeline::default().render(&source, &window).unwrap_err();
        assert_eq!(err.category(), "decode");
    }
}
