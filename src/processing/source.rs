//! Per-pixel reference samplers.
//!
//! These compute every destination sample from its coordinates with no tables,
//! no word loads and no banding. They are slow and exist to define what the
//! kernels must produce.

use rotate_geometry::dims::skip_index;
use rotate_geometry::presets::OutputPacking;
use rotate_geometry::tiled::TiledSurface;
use rotate_geometry::{Degree, Size};

use crate::processing::{KernelPlan, average, field_pair};

/// Random access to source samples by raster coordinate.
pub trait PlaneSource {
    fn luma(&self, x: usize, y: usize) -> u8;
    /// Cb and Cr of chroma sample `(x, y)`.
    fn chroma(&self, x: usize, y: usize) -> [u8; 2];
}

pub struct LinearPlanes<'a> {
    pub luma: &'a [u8],
    pub chroma: &'a [u8],
    pub stride: usize,
}

impl PlaneSource for LinearPlanes<'_> {
    fn luma(&self, x: usize, y: usize) -> u8 {
        self.luma[y * self.stride + x]
    }

    fn chroma(&self, x: usize, y: usize) -> [u8; 2] {
        let s = y * self.stride + x * 2;
        [self.chroma[s], self.chroma[s + 1]]
    }
}

pub struct TiledPlanes<'a> {
    pub luma: &'a [u8],
    pub chroma: &'a [u8],
    pub luma_surface: TiledSurface,
    pub chroma_surface: TiledSurface,
}

impl PlaneSource for TiledPlanes<'_> {
    fn luma(&self, x: usize, y: usize) -> u8 {
        self.luma[self.luma_surface.offset(x as u32, y as u32) as usize]
    }

    fn chroma(&self, x: usize, y: usize) -> [u8; 2] {
        let cb = self.chroma_surface.offset(x as u32 * 2, y as u32) as usize;
        [self.chroma[cb], self.chroma[cb + 1]]
    }
}

/// Source coordinate read for destination `(x, y)` of a plane sized `dst`, rotated
/// out of a plane sized `src`.
pub fn map_point(plan: &KernelPlan, src: Size, dst: Size, x: usize, y: usize) -> (usize, usize) {
    let (sw, sh) = (src.w as u64, src.h as u64);
    let (tw, th) = (dst.w as u64, dst.h as u64);
    let (x64, y64) = (x as u64, y as u64);
    match plan.degree {
        Degree::D0 => (x, y),
        Degree::D180 => (
            src.w as usize - 1 - skip_index(plan.skip, x),
            src.h as usize - 1 - skip_index(plan.skip, y),
        ),
        Degree::D90 => ((y64 * sw / th) as usize, ((tw - 1 - x64) * sh / tw) as usize),
        Degree::D270 => (((th - 1 - y64) * sw / th) as usize, (x64 * sh / tw) as usize),
    }
}

fn luma_at(plan: &KernelPlan, source: &dyn PlaneSource, x: usize, y: usize) -> u8 {
    let (sx, sy) = map_point(plan, plan.source, plan.target, x, y);
    if plan.blend {
        let (a, b) = field_pair(sy, plan.source.h as usize);
        average(source.luma(sx, a), source.luma(sx, b))
    } else {
        source.luma(sx, sy)
    }
}

fn chroma_at(plan: &KernelPlan, source: &dyn PlaneSource, x: usize, y: usize) -> [u8; 2] {
    let sc = plan.source.chroma();
    let (sx, sy) = map_point(plan, sc, plan.target.chroma(), x, y);
    if plan.blend {
        let (a, b) = field_pair(sy, sc.h as usize);
        let (p, q) = (source.chroma(sx, a), source.chroma(sx, b));
        [average(p[0], q[0]), average(p[1], q[1])]
    } else {
        source.chroma(sx, sy)
    }
}

/// The whole destination frame, tightly packed: `(luma, chroma)` for planar
/// output, `(yuyv, [])` for packed output.
pub fn render_reference(plan: &KernelPlan, source: &dyn PlaneSource) -> (Vec<u8>, Vec<u8>) {
    let (tw, th) = (plan.target.w as usize, plan.target.h as usize);
    match plan.output {
        OutputPacking::Planar => {
            let mut luma = Vec::with_capacity(tw * th);
            for y in 0..th {
                luma.extend((0..tw).map(|x| luma_at(plan, source, x, y)));
            }
            let mut chroma = Vec::with_capacity(tw * (th / 2));
            for y in 0..th / 2 {
                for x in 0..tw / 2 {
                    chroma.extend_from_slice(&chroma_at(plan, source, x, y));
                }
            }
            (luma, chroma)
        }
        OutputPacking::Yuyv => {
            let mut packed = Vec::with_capacity(tw * th * 2);
            for y in 0..th {
                for x in (0..tw).step_by(2) {
                    let [cb, cr] = chroma_at(plan, source, x / 2, y / 2);
                    packed.extend_from_slice(&[
                        luma_at(plan, source, x, y),
                        cb,
                        luma_at(plan, source, x + 1, y),
                        cr,
                    ]);
                }
            }
            (packed, Vec::new())
        }
    }
}
