// SPDX-License-Identifier: MIT
//! # Tiled Surface Addressing
//!
//! Hardware decoders on the tiled platforms write each plane as fixed-size tiles
//! (16 bytes × 32 rows) laid out in row-major tile order. Inside a tile, rows are
//! contiguous. A raster coordinate therefore splits into a column part and a row
//! part that simply add:
//!
//! ```text
//! offset(x, y) = (x / tw) * tile_bytes + x % tw
//!              + (y / th) * tiles_per_row * tile_bytes + (y % th) * tw
//! ```
//!
//! Tile width is a multiple of 8, so an 8-byte aligned raster word never straddles
//! two tiles. The tables below store tiled *byte* offsets: `pos & !7` is the aligned
//! 64-bit word to load and `pos & 7` the byte lane inside it.

use crate::dims::{skip_index, Degree, SkipFactor, Size};
use crate::error::{try_table, GeometryError, GeometryResult};
use crate::tables::QuarterTurnTables;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileGeometry {
    /// Tile width in bytes.
    pub width: u32,
    /// Tile height in rows.
    pub height: u32,
}

impl TileGeometry {
    pub const TILE_16X32: TileGeometry = TileGeometry { width: 16, height: 32 };

    pub fn bytes(self) -> u32 {
        self.width * self.height
    }
}

/// One tiled plane: stride in bytes (whole tiles) and rows padded to whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TiledSurface {
    pub tile: TileGeometry,
    pub stride: u32,
    pub rows: u32,
}

impl TiledSurface {
    /// `visible_rows` is padded up to the tile height.
    pub fn new(tile: TileGeometry, stride: u32, visible_rows: u32) -> GeometryResult<Self> {
        if tile.width == 0 || tile.width % 8 != 0 || tile.height == 0 || stride % tile.width != 0 {
            return Err(GeometryError::BadStride { stride, width: stride, align: tile.width });
        }
        let rows = visible_rows.div_ceil(tile.height) * tile.height;
        Ok(Self { tile, stride, rows })
    }

    /// Bytes the decoder writes for this plane.
    pub fn len(&self) -> usize {
        self.stride as usize * self.rows as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tiles_per_row(&self) -> u32 {
        self.stride / self.tile.width
    }

    #[inline]
    pub fn col_part(&self, x: u32) -> u32 {
        (x / self.tile.width) * self.tile.bytes() + x % self.tile.width
    }

    #[inline]
    pub fn row_part(&self, y: u32) -> u32 {
        (y / self.tile.height) * self.tiles_per_row() * self.tile.bytes()
            + (y % self.tile.height) * self.tile.width
    }

    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> u32 {
        self.col_part(x) + self.row_part(y)
    }
}

/// Raster 8-byte word index to tiled byte offset, for one plane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TiledToLinear {
    pub surface: TiledSurface,
    pub words_per_row: u32,
    pub rows: u32,
    pub offsets: Vec<u32>,
}

impl TiledToLinear {
    pub fn build(surface: TiledSurface, rows: u32) -> GeometryResult<Self> {
        let words_per_row = surface.stride / 8;
        let mut offsets = try_table("tiled-to-linear", words_per_row as usize * rows as usize)?;
        for y in 0..rows {
            for word in 0..words_per_row {
                offsets.push(surface.offset(word * 8, y));
            }
        }
        Ok(Self { surface, words_per_row, rows, offsets })
    }

    /// Tiled byte offset of raster byte `(x, y)`.
    #[inline]
    pub fn position(&self, x: u32, y: u32) -> u32 {
        self.offsets[(y * self.words_per_row + x / 8) as usize] + x % 8
    }
}

/// Flattened per-destination-pixel tiled positions for one quarter-turn angle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TiledRotated {
    pub degree: Degree,
    pub target: Size,
    /// `target.w * target.h` entries, row-major.
    pub luma: Vec<u32>,
    /// `target.chroma().w * target.chroma().h` entries; lanes are always even.
    pub chroma: Vec<u32>,
}

impl TiledRotated {
    /// Combine a quarter-turn remap (built with the tiled stride) with the
    /// tiled-to-linear tables of both planes.
    pub fn build(
        remap: &QuarterTurnTables,
        luma: &TiledToLinear,
        chroma: &TiledToLinear,
    ) -> GeometryResult<Self> {
        let stride = remap.stride;
        if stride != luma.surface.stride || stride != chroma.surface.stride {
            return Err(GeometryError::BadStride { stride, width: remap.source.w, align: luma.surface.tile.width });
        }

        let t = remap.target;
        let mut luma_pos = try_table("tiled rotated luma", t.w as usize * t.h as usize)?;
        for y in 0..t.h as usize {
            for x in 0..t.w as usize {
                let linear = remap.luma.source_offset(x, y) as u32;
                luma_pos.push(luma.position(linear % stride, linear / stride));
            }
        }

        let c = t.chroma();
        let samples_per_line = stride / 2;
        let mut chroma_pos = try_table("tiled rotated chroma", c.w as usize * c.h as usize)?;
        for y in 0..c.h as usize {
            for x in 0..c.w as usize {
                let linear = remap.chroma.source_offset(x, y) as u32;
                let byte_x = (linear % samples_per_line) * 2;
                chroma_pos.push(chroma.position(byte_x, linear / samples_per_line));
            }
        }

        Ok(Self { degree: remap.degree, target: t, luma: luma_pos, chroma: chroma_pos })
    }
}

/// Row and column parts for a 180° read of a tiled source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tiled180 {
    pub target: Size,
    pub luma_rows: Vec<u32>,
    pub luma_cols: Vec<u32>,
    pub chroma_rows: Vec<u32>,
    /// Byte column of each destination CbCr sample.
    pub chroma_cols: Vec<u32>,
}

impl Tiled180 {
    pub fn build(
        source: Size,
        target: Size,
        skip: Option<SkipFactor>,
        luma: &TiledSurface,
        chroma: &TiledSurface,
    ) -> GeometryResult<Self> {
        let src = source.even();
        let (sc, tc) = (src.chroma(), target.chroma());
        if target.is_empty() || tc.is_empty() {
            return Err(GeometryError::DegenerateTarget { source, target });
        }

        let mirror = |len: u32, i: u32| len - 1 - skip_index(skip, i as usize) as u32;

        let mut luma_rows = try_table("tiled 180 rows", target.h as usize)?;
        luma_rows.extend((0..target.h).map(|y| luma.row_part(mirror(src.h, y))));
        let mut luma_cols = try_table("tiled 180 cols", target.w as usize)?;
        luma_cols.extend((0..target.w).map(|x| luma.col_part(mirror(src.w, x))));
        let mut chroma_rows = try_table("tiled 180 rows", tc.h as usize)?;
        chroma_rows.extend((0..tc.h).map(|y| chroma.row_part(mirror(sc.h, y))));
        let mut chroma_cols = try_table("tiled 180 cols", tc.w as usize)?;
        chroma_cols.extend((0..tc.w).map(|x| chroma.col_part(mirror(sc.w, x) * 2)));

        Ok(Self { target, luma_rows, luma_cols, chroma_rows, chroma_cols })
    }
}
