// SPDX-License-Identifier: MIT
//! # Target Dimension Computation
//!
//! Given a source size, a rotation angle and a capability profile, work out the
//! size of the frame the engine will actually produce.
//!
//! ## Rules
//!
//! - Every output dimension is even (`d & !1`) because chroma is subsampled 2×2.
//! - 0° and 180° keep the source size (180° may subsample by the profile's
//!   quality skip factor).
//! - 90° and 270° swap the axes and shrink by `min(w,h) / max(w,h)` so the rotated
//!   frame keeps the source aspect ratio on a landscape panel. If the result still
//!   covers more than the rotated area cap, both sides shrink by 2/3 until it fits.
//! - Low-resolution sources are only swapped, never scaled.
//!
//! All arithmetic is integer floor division, so results are reproducible across
//! platforms.

use crate::error::{GeometryError, GeometryResult};
use crate::presets::CapabilityProfile;

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn area(self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// Both dimensions forced even.
    pub fn even(self) -> Self {
        Self { w: even(self.w), h: even(self.h) }
    }

    /// Chroma plane size in CbCr samples for a 4:2:0 plane of this size.
    pub fn chroma(self) -> Self {
        Self { w: self.w / 2, h: self.h / 2 }
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Clockwise rotation angle. Anything other than 90, 180 or 270 degrees means 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Degree {
    #[default]
    D0,
    D90,
    D180,
    D270,
}

impl Degree {
    pub const ALL: [Degree; 4] = [Degree::D0, Degree::D90, Degree::D180, Degree::D270];

    /// Normalize a raw angle. Unknown values fall back to 0°.
    pub fn from_degrees(degrees: u32) -> Self {
        match degrees {
            90 => Degree::D90,
            180 => Degree::D180,
            270 => Degree::D270,
            _ => Degree::D0,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Degree::D0 => 0,
            Degree::D90 => 90,
            Degree::D180 => 180,
            Degree::D270 => 270,
        }
    }

    /// 90° or 270°: the axes swap.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Degree::D90 | Degree::D270)
    }
}

#[inline]
pub fn even(d: u32) -> u32 {
    d & !1
}

/// Quality subsampling applied to 180° output on profiles that enable it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipFactor {
    /// Keep every 2nd row and column (1920×1080 → 960×540).
    Half,
    /// Drop every 3rd row and column (1920×1080 → 1280×720).
    TwoThirds,
}

impl SkipFactor {
    /// Output length for a source length.
    pub fn keep(self, d: u32) -> u32 {
        match self {
            SkipFactor::Half => d / 2,
            SkipFactor::TwoThirds => (d as u64 * 2 / 3) as u32,
        }
    }

    /// Source index sampled for output index `i`.
    #[inline]
    pub fn src_index(self, i: usize) -> usize {
        match self {
            SkipFactor::Half => i * 2,
            SkipFactor::TwoThirds => i + i / 2,
        }
    }
}

/// `skip.src_index(i)` or `i` when no skip factor is active.
#[inline]
pub fn skip_index(skip: Option<SkipFactor>, i: usize) -> usize {
    match skip {
        Some(s) => s.src_index(i),
        None => i,
    }
}

/// Whether the source is small enough for the swap-only quarter-turn path.
pub fn is_low_resolution(orig: Size, profile: &CapabilityProfile) -> bool {
    profile.low_res_swap && orig.area() < profile.low_res_limit.area()
}

/// Compute the output size for `orig` rotated by `degree`.
///
/// # Arguments
/// * `orig` - Source frame size in pixels
/// * `degree` - Rotation angle
/// * `low_res` - Use the swap-only quarter-turn mapping (see [`is_low_resolution`])
/// * `profile` - Panel limits, area cap, optimization override and skip factor
///
/// # Errors
/// `EmptySource` for a zero dimension, `SourceTooLarge` when the source exceeds the
/// panel, `DegenerateTarget` if scaling collapsed a side to zero.
pub fn compute_target_dimensions(
    orig: Size,
    degree: Degree,
    low_res: bool,
    profile: &CapabilityProfile,
) -> GeometryResult<Size> {
    if orig.is_empty() {
        return Err(GeometryError::EmptySource(orig));
    }
    if orig.w > profile.panel.w || orig.h > profile.panel.h {
        return Err(GeometryError::SourceTooLarge { source: orig, panel: profile.panel });
    }

    let target = match degree {
        Degree::D0 => orig.even(),
        Degree::D180 => match profile.skip_factor {
            Some(skip) => Size::new(even(skip.keep(orig.w)), even(skip.keep(orig.h))),
            None => orig.even(),
        },
        Degree::D90 | Degree::D270 => {
            if let Some(fixed) = profile.optimized_target(orig) {
                fixed.even()
            } else if low_res {
                Size::new(even(orig.h.saturating_sub(profile.low_res_trim)), even(orig.w))
            } else {
                quarter_turn_scaled(orig, profile.rotated_area_cap)
            }
        }
    };

    if target.is_empty() {
        return Err(GeometryError::DegenerateTarget { source: orig, target });
    }
    Ok(target)
}

/// Swap axes, shrink by the short/long ratio, then enforce the area cap.
fn quarter_turn_scaled(orig: Size, area_cap: u64) -> Size {
    let long = orig.w.max(orig.h) as u64;
    let short = orig.w.min(orig.h) as u64;

    let mut w = even((orig.h as u64 * short / long) as u32);
    let mut h = even((orig.w as u64 * short / long) as u32);

    while (w as u64 * h as u64) > area_cap && w > 0 && h > 0 {
        w = even((w as u64 * 2 / 3) as u32);
        h = even((h as u64 * 2 / 3) as u32);
    }
    Size::new(w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic() -> CapabilityProfile {
        CapabilityProfile::generic()
    }

    #[test]
    fn test_full_hd_quarter_turn() {
        let p = generic();
        let src = Size::new(1920, 1080);
        assert_eq!(compute_target_dimensions(src, Degree::D90, false, &p), Ok(Size::new(606, 1080)));
        assert_eq!(compute_target_dimensions(src, Degree::D270, false, &p), Ok(Size::new(606, 1080)));
    }

    #[test]
    fn test_half_turn_keeps_size() {
        let p = generic();
        let t = compute_target_dimensions(Size::new(1919, 1079), Degree::D180, false, &p).unwrap();
        assert_eq!(t, Size::new(1918, 1078));
    }

    #[test]
    fn test_area_cap_rescales() {
        let p = generic();
        // 1440x1080 scales to 810x1080 which is over the cap, 2/3 brings it to 540x720.
        let t = compute_target_dimensions(Size::new(1440, 1080), Degree::D90, false, &p).unwrap();
        assert_eq!(t, Size::new(540, 720));
        // Square frames only shrink through the cap.
        let t = compute_target_dimensions(Size::new(1080, 1080), Degree::D90, false, &p).unwrap();
        assert_eq!(t, Size::new(720, 720));
    }

    /// Every valid source up to the panel size, sampled on a coarse grid plus
    /// the edges.
    fn sources() -> impl Iterator<Item = Size> {
        let widths = (1..=1920).step_by(7).chain([2, 1918, 1919, 1920]);
        widths.flat_map(|w| (1..=1080).step_by(5).chain([2, 1079, 1080]).map(move |h| Size::new(w, h)))
    }

    #[test]
    fn test_targets_are_even_and_capped() {
        for p in [generic(), CapabilityProfile::tiled(), CapabilityProfile::packed_panel()] {
            for src in sources() {
                let low_res = is_low_resolution(src, &p);
                for degree in Degree::ALL {
                    let t = match compute_target_dimensions(src, degree, low_res, &p) {
                        Ok(t) => t,
                        Err(GeometryError::DegenerateTarget { .. }) => continue,
                        Err(e) => panic!("{} {src} {degree:?}: {e}", p.name),
                    };
                    assert_eq!((t.w % 2, t.h % 2), (0, 0), "{} {src} {degree:?} -> {t}", p.name);
                    assert!(t.w <= p.panel.w.max(p.panel.h) && t.h <= p.panel.h.max(p.panel.w));
                    if degree.is_quarter_turn() {
                        assert!(t.area() <= p.rotated_area_cap, "{} {src} {degree:?} -> {t}", p.name);
                    } else {
                        assert!(t.w <= src.w && t.h <= src.h, "{} {src} {degree:?} -> {t}", p.name);
                    }
                }
            }
        }
    }

    fn round_trip(src: Size) -> (Size, Size) {
        let p = generic();
        let there = compute_target_dimensions(src, Degree::D90, is_low_resolution(src, &p), &p).unwrap();
        let back = compute_target_dimensions(there, Degree::D270, is_low_resolution(there, &p), &p).unwrap();
        (there, back)
    }

    #[test]
    fn test_quarter_turn_round_trip_keeps_aspect() {
        let sources = [
            (1920, 1080),
            (1600, 900),
            (1366, 768),
            (1280, 720),
            (1024, 576),
            (960, 540),
            (854, 480),
            (640, 360),
            (426, 240),
        ];
        for (w, h) in sources {
            let (there, back) = round_trip(Size::new(w, h));
            // Back in landscape, with the source aspect ratio to within a pixel.
            assert!(back.w >= back.h, "{w}x{h} -> {there} -> {back}");
            let expected = back.w * h / w;
            assert!(back.h.abs_diff(expected) <= 1, "{w}x{h} -> {there} -> {back}, expected height {expected}");
        }
        assert_eq!(round_trip(Size::new(1920, 1080)), (Size::new(606, 1080), Size::new(606, 340)));
        // Low-resolution sources swap without scaling both ways.
        assert_eq!(round_trip(Size::new(640, 360)).1, Size::new(640, 360));
    }

    #[test]
    fn test_near_square_round_trip_drifts() {
        // Both legs floor the short/long ratio and force even, so near-square
        // sources come back a few rows short of the source aspect.
        let (there, back) = round_trip(Size::new(631, 606));
        assert_eq!(there, Size::new(580, 606));
        assert_eq!(back, Size::new(580, 554));
        assert_eq!(580 * 606 / 631, 557);
    }

    #[test]
    fn test_low_res_swaps() {
        let p = generic();
        let src = Size::new(64, 48);
        assert!(is_low_resolution(src, &p));
        let t = compute_target_dimensions(src, Degree::D270, true, &p).unwrap();
        assert_eq!(t, Size::new(48, 64));
    }

    #[test]
    fn test_rejects_bad_sources() {
        let p = generic();
        assert_eq!(
            compute_target_dimensions(Size::new(0, 1080), Degree::D0, false, &p),
            Err(GeometryError::EmptySource(Size::new(0, 1080)))
        );
        assert!(matches!(
            compute_target_dimensions(Size::new(1921, 1080), Degree::D0, false, &p),
            Err(GeometryError::SourceTooLarge { .. })
        ));
        assert!(matches!(
            compute_target_dimensions(Size::new(1, 1), Degree::D90, true, &p),
            Err(GeometryError::DegenerateTarget { .. })
        ));
    }

    #[test]
    fn test_skip_factor_targets() {
        let mut p = generic();
        let src = Size::new(1920, 1080);
        p.skip_factor = Some(SkipFactor::TwoThirds);
        assert_eq!(compute_target_dimensions(src, Degree::D180, false, &p), Ok(Size::new(1280, 720)));
        p.skip_factor = Some(SkipFactor::Half);
        assert_eq!(compute_target_dimensions(src, Degree::D180, false, &p), Ok(Size::new(960, 540)));
        // Only 180° subsamples.
        assert_eq!(compute_target_dimensions(src, Degree::D0, false, &p), Ok(src));
    }

    #[test]
    fn test_skip_index_stays_in_source() {
        for skip in [SkipFactor::Half, SkipFactor::TwoThirds] {
            for d in [2u32, 3, 10, 541, 1080, 1920] {
                let kept = skip.keep(d) as usize;
                if kept > 0 {
                    assert!(skip.src_index(kept - 1) < d as usize, "{skip:?} {d}");
                }
            }
        }
    }

    #[test]
    fn test_degree_normalization() {
        assert_eq!(Degree::from_degrees(90), Degree::D90);
        assert_eq!(Degree::from_degrees(180), Degree::D180);
        assert_eq!(Degree::from_degrees(270), Degree::D270);
        for raw in [0u32, 1, 45, 89, 91, 360, 450, u32::MAX] {
            assert_eq!(Degree::from_degrees(raw), Degree::D0);
        }
    }
}
