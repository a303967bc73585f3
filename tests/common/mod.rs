//! Shared helpers for the integration tests: push a synthetic frame through a
//! real context and compute what the per-pixel reference says it should be.

#![allow(dead_code)]

use frame_rotate::pattern::Nv12Frame;
use frame_rotate::processing::source::render_reference;
use frame_rotate::processing::{KernelPlan, SourceLayout};
use frame_rotate::{CapabilityProfile, Degree, Kernel, RotateConfig, RotationContext, Size};
use rotate_geometry::dims::{compute_target_dimensions, is_low_resolution};
use rotate_geometry::presets::codec;

/// Tightly packed output of one rotated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotated {
    pub size: Size,
    pub kernel: Kernel,
    pub luma: Vec<u8>,
    pub chroma: Vec<u8>,
}

impl Rotated {
    /// Feed a planar output back in as a source frame.
    pub fn to_frame(&self) -> Nv12Frame {
        let mut raw = self.luma.clone();
        raw.extend_from_slice(&self.chroma);
        Nv12Frame::from_raw(raw, self.size.w, self.size.h).unwrap()
    }
}

pub fn config_for(profile: &CapabilityProfile, frame: &Nv12Frame, degree: Degree, interlaced: bool) -> RotateConfig {
    let line_size = match profile.tile {
        Some(tile) if profile.is_tiled_codec(codec::H264) => frame.width.div_ceil(tile.width) * tile.width,
        _ => frame.stride,
    };
    RotateConfig::new(degree.degrees(), frame.width, frame.height)
        .with_codec(codec::H264)
        .with_interlaced(interlaced)
        .with_line_size(line_size)
}

/// Open a context for `frame` and rotate it `repeat` times, returning the last
/// output.
pub fn rotate_with(
    ctx: &mut RotationContext,
    frame: &Nv12Frame,
    degree: Degree,
    interlaced: bool,
    repeat: usize,
) -> Rotated {
    let profile = ctx.profile().clone();
    ctx.open(&config_for(&profile, frame, degree, interlaced)).unwrap();
    let kernel = ctx.kernel().unwrap();

    let tiled = match profile.tile {
        Some(tile) if profile.is_tiled_codec(codec::H264) => Some(frame.to_tiled(tile).unwrap()),
        _ => None,
    };
    let input = match &tiled {
        Some(t) => t.descriptor(),
        None => frame.descriptor(),
    };

    for _ in 1..repeat.max(1) {
        assert!(ctx.apply(&input, degree).unwrap().is_done());
    }
    let out = ctx.apply(&input, degree).unwrap().frame().unwrap();
    Rotated {
        size: Size::new(out.width, out.height),
        kernel,
        luma: out.luma_rows(),
        chroma: out.chroma_rows(),
    }
}

pub fn rotate(profile: CapabilityProfile, frame: &Nv12Frame, degree: Degree, interlaced: bool) -> Rotated {
    let mut ctx = RotationContext::with_profile(profile);
    rotate_with(&mut ctx, frame, degree, interlaced, 1)
}

/// Per-pixel reference output for the same configuration.
pub fn reference(profile: &CapabilityProfile, frame: &Nv12Frame, degree: Degree, interlaced: bool) -> (Vec<u8>, Vec<u8>) {
    let source = Size::new(frame.width, frame.height);
    let low_res = is_low_resolution(source, profile);
    let target = compute_target_dimensions(source, degree, low_res, profile).unwrap();
    let layout = if profile.is_tiled_codec(codec::H264) { SourceLayout::Tiled } else { SourceLayout::Linear };
    let plan = KernelPlan::for_profile(profile, source, degree, layout, target, interlaced, low_res);
    render_reference(&plan, &frame.planes())
}

/// Index and values of the first differing byte, for readable failures.
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<(usize, u8, u8)> {
    if a.len() != b.len() {
        return Some((a.len().min(b.len()), 0, 0));
    }
    a.iter().zip(b).enumerate().find(|(_, (x, y))| x != y).map(|(i, (x, y))| (i, *x, *y))
}

pub const ALL_DEGREES: [Degree; 4] = [Degree::D0, Degree::D90, Degree::D180, Degree::D270];
