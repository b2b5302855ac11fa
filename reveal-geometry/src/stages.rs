// SPDX-License-Identifier: MIT
//! # Reveal Stage Sequencing
//!
//! Each missed guess zooms the picture out a little. Starting from the game's
//! maximum zoom, every stage multiplies the scale by a reduction factor that
//! itself shrinks by [`REDUCTION_STEP`] per application, so later guesses reveal
//! progressively more. The last stage is the full, undistorted reveal.
//!
//! | Stage | Applications | Meaning |
//! |-------|--------------|---------|
//! | 0 | 0 | first clue, `max_zoom` |
//! | 1-4 | 1-4 | one more miss each |
//! | 5 | n/a | reveal, scale exactly 1 |

use std::fmt;

/// First reduction factor applied when moving from stage 0 to stage 1.
pub const INITIAL_REDUCTION: f64 = 0.90;
/// Amount the reduction factor decreases after each application.
pub const REDUCTION_STEP: f64 = 0.025;
/// Total number of stages, including the reveal.
pub const STAGE_COUNT: usize = 6;

/// Index of a reveal stage, guaranteed to lie in `0..=5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageIndex(u8);

impl StageIndex {
    pub const FIRST: Self = Self(0);
    pub const REVEAL: Self = Self(5);

    /// Returns `None` for indices past the reveal stage.
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < STAGE_COUNT).then_some(Self(index))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_reveal(self) -> bool {
        self == Self::REVEAL
    }

    /// All six stages in order.
    pub fn all() -> impl Iterator<Item = StageIndex> {
        (0..STAGE_COUNT as u8).map(StageIndex)
    }
}

impl fmt::Display for StageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zoom multiplier for one stage.
///
/// The result is never below 1: a zoom under 1 would shrink the photo inside
/// its frame, which the client never does.
pub fn scale_for_stage(stage: StageIndex, max_zoom: f64) -> f64 {
    if stage.is_reveal() {
        return 1.0;
    }

    let mut scale = max_zoom;
    let mut reduction = INITIAL_REDUCTION;
    for _ in 0..stage.get() {
        scale *= reduction;
        reduction -= REDUCTION_STEP;
    }
    scale.max(1.0)
}

/// Scales for all six stages, indexed by stage number.
pub fn stage_scales(max_zoom: f64) -> [f64; STAGE_COUNT] {
    let mut scales = [1.0; STAGE_COUNT];
    for stage in StageIndex::all() {
        scales[usize::from(stage.get())] = scale_for_stage(stage, max_zoom);
    }
    scales
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(i: u8) -> StageIndex {
        StageIndex::new(i).unwrap()
    }

    #[test]
    fn test_stage_index_bounds() {
        assert!(StageIndex::new(5).is_some());
        assert!(StageIndex::new(6).is_none());
        assert_eq!(StageIndex::all().count(), STAGE_COUNT);
        assert!(StageIndex::REVEAL.is_reveal());
    }

    #[test]
    fn test_first_stage_is_max_zoom() {
        for zoom in [1.0, 2.5, 4.0, 5.0, 12.0] {
            assert_eq!(scale_for_stage(StageIndex::FIRST, zoom), zoom);
        }
    }

    #[test]
    fn test_reveal_is_always_one() {
        for zoom in [0.5, 1.0, 5.0, 100.0] {
            assert_eq!(scale_for_stage(StageIndex::REVEAL, zoom), 1.0);
        }
    }

    #[test]
    fn test_compounding_decay() {
        let s = stage_scales(5.0);
        assert!((s[1] - 4.5).abs() < 1e-12);
        assert!((s[2] - 4.5 * 0.875).abs() < 1e-12);
        assert!((s[3] - 4.5 * 0.875 * 0.85).abs() < 1e-12);
        assert!((s[4] - 4.5 * 0.875 * 0.85 * 0.825).abs() < 1e-12);
        assert_eq!(s[5], 1.0);
    }

    #[test]
    fn test_sequence_is_non_increasing() {
        for zoom in [1.0, 1.1, 1.5, 2.0, 3.3, 5.0, 8.0, 40.0] {
            let s = stage_scales(zoom);
            for w in s.windows(2) {
                assert!(w[0] >= w[1], "zoom {zoom}: {s:?}");
            }
        }
    }

    #[test]
    fn test_clamps_to_one() {
        assert_eq!(scale_for_stage(stage(4), 1.2), 1.0);
        assert_eq!(scale_for_stage(stage(0), 0.5), 1.0);
    }
}
