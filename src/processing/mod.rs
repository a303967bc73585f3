//! # Transform Kernels
//!
//! Per-frame pixel remapping. A [`KernelPlan`] is fixed whenever the geometry or
//! the angle changes and selects one [`Kernel`]; every worker then runs that
//! kernel over its own band of destination rows.
//!
//! ## Variants
//!
//! | Source | Output | 0° | 180° | 90° / 270° |
//! |---|---|---|---|---|
//! | linear | planar | row copy | point reflection | remap tables |
//! | tiled | planar | detile words | two rows per pass | flattened tile positions |
//! | either | YUYV | packed directly from the source | | |
//!
//! The per-pixel samplers in [`source`] define the expected output; every variant
//! here must match them byte for byte.

pub mod job;
pub mod linear;
pub mod packed;
pub mod source;
pub mod throttle;
pub mod tiled;

use std::ops::Range;

use rotate_geometry::dims::SkipFactor;
use rotate_geometry::presets::{CapabilityProfile, OutputPacking, TableSharing, Traversal};
use rotate_geometry::tables::QuarterTurnTables;
use rotate_geometry::tiled::TiledRotated;
use rotate_geometry::{Degree, Size};

use crate::core::table_arena::{DetileTables, TableGeneration};
use crate::core::worker_pool::WorkerRows;
use crate::processing::packed::{LinearFetch, LinearMap, TiledFetch, TiledMap};

/// How the decoder laid out the source planes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceLayout {
    Linear,
    /// Tiles of the profile's tile geometry.
    Tiled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kernel {
    Copy,
    HalfTurn,
    QuarterTurnRows,
    QuarterTurnColumns,
    /// Quarter turn averaging each source line with its field partner.
    QuarterTurnBlend,
    Detile,
    TiledHalfTurn,
    TiledQuarterTurn,
    PackedLinear,
    PackedTiled,
}

/// Everything a kernel needs to know besides the tables and the pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelPlan {
    pub degree: Degree,
    pub layout: SourceLayout,
    pub output: OutputPacking,
    /// Average vertically adjacent field lines.
    pub blend: bool,
    pub traversal: Traversal,
    /// Half turns only.
    pub skip: Option<SkipFactor>,
    pub sharing: TableSharing,
    /// Even source size.
    pub source: Size,
    pub target: Size,
}

impl KernelPlan {
    pub fn for_profile(
        profile: &CapabilityProfile,
        orig: Size,
        degree: Degree,
        layout: SourceLayout,
        target: Size,
        interlaced: bool,
        low_res: bool,
    ) -> Self {
        let output = profile.output_for(orig);
        let blend = interlaced
            && layout == SourceLayout::Linear
            && output == OutputPacking::Planar
            && (degree == Degree::D180 || (degree.is_quarter_turn() && low_res));
        Self {
            degree,
            layout,
            output,
            blend,
            traversal: profile.traversal,
            skip: if degree == Degree::D180 { profile.skip_factor } else { None },
            sharing: profile.table_sharing,
            source: orig.even(),
            target,
        }
    }

    pub fn kernel(&self) -> Kernel {
        match (self.output, self.layout, self.degree) {
            (OutputPacking::Yuyv, SourceLayout::Linear, _) => Kernel::PackedLinear,
            (OutputPacking::Yuyv, SourceLayout::Tiled, _) => Kernel::PackedTiled,
            (OutputPacking::Planar, SourceLayout::Linear, Degree::D0) => Kernel::Copy,
            (OutputPacking::Planar, SourceLayout::Linear, Degree::D180) => Kernel::HalfTurn,
            (OutputPacking::Planar, SourceLayout::Linear, _) if self.blend => Kernel::QuarterTurnBlend,
            (OutputPacking::Planar, SourceLayout::Linear, _) => match self.traversal {
                Traversal::RowMajor => Kernel::QuarterTurnRows,
                Traversal::ColumnMajor => Kernel::QuarterTurnColumns,
            },
            (OutputPacking::Planar, SourceLayout::Tiled, Degree::D0) => Kernel::Detile,
            (OutputPacking::Planar, SourceLayout::Tiled, Degree::D180) => Kernel::TiledHalfTurn,
            (OutputPacking::Planar, SourceLayout::Tiled, _) => Kernel::TiledQuarterTurn,
        }
    }

    /// Bytes per destination row of plane 0.
    pub fn primary_row_bytes(&self) -> usize {
        self.target.w as usize * self.output.bytes_per_pixel() as usize
    }

    /// Bytes per destination chroma row, zero for packed output.
    pub fn chroma_row_bytes(&self) -> usize {
        match self.output {
            OutputPacking::Planar => self.target.w as usize,
            OutputPacking::Yuyv => 0,
        }
    }

    pub fn chroma_rows(&self) -> usize {
        match self.output {
            OutputPacking::Planar => self.target.h as usize / 2,
            OutputPacking::Yuyv => 0,
        }
    }

    /// Bytes written into plane 0 and the chroma plane per frame.
    pub fn output_len(&self) -> (usize, usize) {
        (
            self.primary_row_bytes() * self.target.h as usize,
            self.chroma_row_bytes() * self.chroma_rows(),
        )
    }
}

/// Source planes of one frame. For tiled sources `stride` is the tiled stride.
#[derive(Clone, Copy, Debug)]
pub struct SourceFrame<'a> {
    pub luma: &'a [u8],
    pub chroma: &'a [u8],
    pub stride: usize,
}

/// The destination rows one worker owns, already cut out of the output planes.
#[derive(Debug)]
pub struct DstBand<'a> {
    pub rows: WorkerRows,
    pub primary: &'a mut [u8],
    pub chroma: &'a mut [u8],
}

/// Worker-private copies of the flattened tile positions for its band.
#[derive(Debug, Default)]
pub struct WorkerCache {
    key: Option<(u64, Range<usize>, Range<usize>)>,
    luma: Vec<u32>,
    chroma: Vec<u32>,
    refreshes: u64,
}

impl WorkerCache {
    /// How often the private copy was rebuilt.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Tile positions of `luma_rows` / `chroma_rows`, copied privately if the
    /// profile asks for per-worker tables.
    fn band<'t>(
        &'t mut self,
        generation: u64,
        rotated: &'t TiledRotated,
        luma_rows: Range<usize>,
        chroma_rows: Range<usize>,
        sharing: TableSharing,
    ) -> (&'t [u32], &'t [u32]) {
        let tw = rotated.target.w as usize;
        let cw = tw / 2;
        let luma = &rotated.luma[luma_rows.start * tw..luma_rows.end * tw];
        let chroma = &rotated.chroma[chroma_rows.start * cw..chroma_rows.end * cw];
        if sharing == TableSharing::Shared {
            return (luma, chroma);
        }

        let key = (generation, luma_rows, chroma_rows);
        if self.key.as_ref() != Some(&key) {
            self.luma.clear();
            self.luma.extend_from_slice(luma);
            self.chroma.clear();
            self.chroma.extend_from_slice(chroma);
            self.key = Some(key);
            self.refreshes += 1;
        }
        (&self.luma, &self.chroma)
    }
}

#[inline]
pub(crate) fn average(a: u8, b: u8) -> u8 {
    ((a as u16 + b as u16 + 1) >> 1) as u8
}

/// The two lines of the field pair containing line `r` of a plane with `h` lines.
#[inline]
pub(crate) fn field_pair(r: usize, h: usize) -> (usize, usize) {
    (r & !1, (r | 1).min(h - 1))
}

/// Chroma rows a packed band reads: every luma row pair maps to one chroma row.
pub(crate) fn packed_chroma_window(luma: &Range<usize>) -> Range<usize> {
    luma.start / 2..luma.end.div_ceil(2)
}

fn remap(tables: &TableGeneration) -> Result<&QuarterTurnTables, String> {
    tables.remap.as_ref().ok_or_else(|| missing(tables, "quarter-turn remap"))
}

fn detile_tables(tables: &TableGeneration) -> Result<&DetileTables, String> {
    tables.detile.as_deref().ok_or_else(|| missing(tables, "tiled-to-linear"))
}

fn missing(tables: &TableGeneration, what: &str) -> String {
    format!("table generation {} has no {what} tables", tables.id)
}

/// Run the plan's kernel over one band.
pub fn run(
    plan: &KernelPlan,
    tables: &TableGeneration,
    src: &SourceFrame<'_>,
    mut dst: DstBand<'_>,
    cache: &mut WorkerCache,
) -> Result<(), String> {
    match plan.kernel() {
        Kernel::Copy => linear::copy(plan, src, &mut dst),
        Kernel::HalfTurn => linear::half_turn(plan, src, &mut dst),
        Kernel::QuarterTurnRows | Kernel::QuarterTurnColumns | Kernel::QuarterTurnBlend => {
            linear::quarter_turn(plan, remap(tables)?, src, &mut dst)
        }
        Kernel::Detile => tiled::detile(plan, detile_tables(tables)?, src, &mut dst),
        Kernel::TiledHalfTurn => {
            let half = tables.tiled_180.as_ref().ok_or_else(|| missing(tables, "tiled 180"))?;
            tiled::half_turn(plan, half, src, &mut dst)
        }
        Kernel::TiledQuarterTurn => {
            let rotated = tables.tiled_rotated.as_ref().ok_or_else(|| missing(tables, "tiled rotated"))?;
            let (luma, chroma) =
                cache.band(tables.id, rotated, dst.rows.luma.clone(), dst.rows.chroma.clone(), plan.sharing);
            tiled::quarter_turn(luma, chroma, src, &mut dst)
        }
        Kernel::PackedLinear => {
            let map = match plan.degree {
                Degree::D0 => LinearMap::Identity,
                Degree::D180 => LinearMap::HalfTurn { source: plan.source, skip: plan.skip },
                Degree::D90 | Degree::D270 => LinearMap::QuarterTurn(remap(tables)?),
            };
            let mut fetch = LinearFetch::new(*src, map);
            packed::pack_yuyv(&mut fetch, dst.rows.luma.clone(), plan.target.w as usize, dst.primary)
        }
        Kernel::PackedTiled => {
            let map = match plan.degree {
                Degree::D0 => TiledMap::Detile(detile_tables(tables)?),
                Degree::D180 => {
                    TiledMap::HalfTurn(tables.tiled_180.as_ref().ok_or_else(|| missing(tables, "tiled 180"))?)
                }
                Degree::D90 | Degree::D270 => {
                    let rotated =
                        tables.tiled_rotated.as_ref().ok_or_else(|| missing(tables, "tiled rotated"))?;
                    let window = packed_chroma_window(&dst.rows.luma);
                    let (luma_first, chroma_first) = (dst.rows.luma.start, window.start);
                    let (luma, chroma) =
                        cache.band(tables.id, rotated, dst.rows.luma.clone(), window, plan.sharing);
                    TiledMap::QuarterTurn {
                        luma,
                        chroma,
                        luma_first,
                        chroma_first,
                        width: plan.target.w as usize,
                    }
                }
            };
            let mut fetch = TiledFetch::new(src.luma, src.chroma, map);
            packed::pack_yuyv(&mut fetch, dst.rows.luma.clone(), plan.target.w as usize, dst.primary)
        }
    }
    Ok(())
}
