// SPDX-License-Identifier: MIT
//! # Quarter-Turn Remap Tables
//!
//! For a destination pixel `(x, y)` the source offset is `src_col[x] + src_row[y]`
//! and the destination offset is `dst_row[y] + x`. Scaling is folded into the
//! tables, so kernels never divide.
//!
//! 90° is clockwise: the top destination row is the left source column read
//! bottom to top. 270° is the mirror image of that.

use crate::dims::{Degree, Size};
use crate::error::{try_table, GeometryError, GeometryResult};

/// Remap arrays for one plane. Offsets are in plane units (bytes for luma, CbCr
/// samples for chroma).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaneRemap {
    /// Destination offset of each destination row.
    pub dst_row: Vec<u32>,
    /// Source offset contributed by each destination column (a source line).
    pub src_col: Vec<u32>,
    /// Source offset contributed by each destination row (a source column).
    pub src_row: Vec<u32>,
    /// Same as `src_col` but pointing at the other line of the field pair.
    pub src_col_pair: Vec<u32>,
    /// Destination plane size this remap was built for.
    pub target: Size,
}

impl PlaneRemap {
    /// Source offset for destination `(x, y)`.
    #[inline]
    pub fn source_offset(&self, x: usize, y: usize) -> usize {
        (self.src_col[x] + self.src_row[y]) as usize
    }
}

/// Luma and chroma remaps for one quarter-turn angle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuarterTurnTables {
    pub degree: Degree,
    pub source: Size,
    /// Source line size in bytes.
    pub stride: u32,
    pub target: Size,
    pub luma: PlaneRemap,
    pub chroma: PlaneRemap,
}

/// Build the six remap arrays for a 90° or 270° rotation.
///
/// `source` is the (even) source size, `stride` its luma line size in bytes. The
/// chroma plane is assumed to share the luma line size, as NV12 does.
pub fn build_quarter_turn(
    source: Size,
    stride: u32,
    target: Size,
    degree: Degree,
) -> GeometryResult<QuarterTurnTables> {
    let source = source.even();
    if target.is_empty() || target.chroma().is_empty() || source.chroma().is_empty() {
        return Err(GeometryError::DegenerateTarget { source, target });
    }
    if stride < source.w {
        return Err(GeometryError::BadStride { stride, width: source.w, align: 1 });
    }
    let clockwise = match degree {
        Degree::D90 => true,
        Degree::D270 => false,
        // Half turns and identity need no remap.
        Degree::D0 | Degree::D180 => {
            return Err(GeometryError::DegenerateTarget { source, target: Size::default() })
        }
    };

    let luma = build_plane(source, stride, target, clockwise, "luma remap")?;
    let chroma = build_plane(source.chroma(), stride / 2, target.chroma(), clockwise, "chroma remap")?;

    Ok(QuarterTurnTables { degree, source, stride, target, luma, chroma })
}

fn build_plane(
    src: Size,
    stride: u32,
    dst: Size,
    clockwise: bool,
    table: &'static str,
) -> GeometryResult<PlaneRemap> {
    let (sw, sh) = (src.w as u64, src.h as u64);
    let (tw, th) = (dst.w as u64, dst.h as u64);

    let mut dst_row = try_table(table, dst.h as usize)?;
    let mut src_row = try_table(table, dst.h as usize)?;
    for y in 0..th {
        dst_row.push((y * tw) as u32);
        // Destination rows walk source columns.
        let sx = if clockwise { y * sw / th } else { (th - 1 - y) * sw / th };
        src_row.push(sx as u32);
    }

    let mut src_col = try_table(table, dst.w as usize)?;
    let mut src_col_pair = try_table(table, dst.w as usize)?;
    for x in 0..tw {
        // Destination columns walk source lines.
        let sy = if clockwise { (tw - 1 - x) * sh / tw } else { x * sh / tw };
        let partner = (sy ^ 1).min(sh - 1);
        src_col.push((sy * stride as u64) as u32);
        src_col_pair.push((partner * stride as u64) as u32);
    }

    Ok(PlaneRemap { dst_row, src_col, src_row, src_col_pair, target: dst })
}
