//! YUYV packing straight from the source, with no intermediate raster.
//!
//! Each pair of destination pixels becomes `Y0 Cb Y1 Cr`. The chroma sample of
//! destination pixel `(x, y)` is chroma sample `(x / 2, y / 2)` of the rotated
//! frame, so two consecutive output rows share one chroma row.

use std::ops::Range;

use rotate_geometry::dims::{SkipFactor, skip_index};
use rotate_geometry::tables::QuarterTurnTables;
use rotate_geometry::tiled::Tiled180;
use rotate_geometry::Size;

use crate::core::table_arena::DetileTables;
use crate::processing::SourceFrame;
use crate::processing::tiled::WordCache;

/// Reads source samples for destination coordinates.
pub trait PixelFetch {
    fn luma(&mut self, x: usize, y: usize) -> u8;
    /// `(x, y)` in destination chroma sample units.
    fn chroma(&mut self, x: usize, y: usize) -> [u8; 2];
}

/// Write rows `rows` of a `width`-pixel YUYV frame into `out`.
pub fn pack_yuyv<F: PixelFetch>(fetch: &mut F, rows: Range<usize>, width: usize, out: &mut [u8]) {
    for (line, y) in out.chunks_exact_mut(width * 2).zip(rows) {
        for (cx, quad) in line.chunks_exact_mut(4).enumerate() {
            let x = cx * 2;
            let [cb, cr] = fetch.chroma(cx, y / 2);
            quad.copy_from_slice(&[fetch.luma(x, y), cb, fetch.luma(x + 1, y), cr]);
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum LinearMap<'t> {
    Identity,
    HalfTurn { source: Size, skip: Option<SkipFactor> },
    QuarterTurn(&'t QuarterTurnTables),
}

pub struct LinearFetch<'a, 't> {
    src: SourceFrame<'a>,
    map: LinearMap<'t>,
}

impl<'a, 't> LinearFetch<'a, 't> {
    pub fn new(src: SourceFrame<'a>, map: LinearMap<'t>) -> Self {
        Self { src, map }
    }

    /// Sample offset of chroma `(x, y)` in a plane `samples` CbCr pairs per line.
    fn chroma_offset(&self, x: usize, y: usize) -> usize {
        let samples = self.src.stride / 2;
        match self.map {
            LinearMap::Identity => y * samples + x,
            LinearMap::HalfTurn { source, skip } => {
                let c = source.chroma();
                (c.h as usize - 1 - skip_index(skip, y)) * samples + c.w as usize - 1 - skip_index(skip, x)
            }
            LinearMap::QuarterTurn(tables) => tables.chroma.source_offset(x, y),
        }
    }
}

impl PixelFetch for LinearFetch<'_, '_> {
    #[inline]
    fn luma(&mut self, x: usize, y: usize) -> u8 {
        let offset = match self.map {
            LinearMap::Identity => y * self.src.stride + x,
            LinearMap::HalfTurn { source, skip } => {
                (source.h as usize - 1 - skip_index(skip, y)) * self.src.stride + source.w as usize
                    - 1
                    - skip_index(skip, x)
            }
            LinearMap::QuarterTurn(tables) => tables.luma.source_offset(x, y),
        };
        self.src.luma[offset]
    }

    #[inline]
    fn chroma(&mut self, x: usize, y: usize) -> [u8; 2] {
        let s = self.chroma_offset(x, y) * 2;
        [self.src.chroma[s], self.src.chroma[s + 1]]
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TiledMap<'t> {
    Detile(&'t DetileTables),
    HalfTurn(&'t Tiled180),
    /// Flattened positions of a band; `*_first` is the first row they cover.
    QuarterTurn {
        luma: &'t [u32],
        chroma: &'t [u32],
        luma_first: usize,
        chroma_first: usize,
        width: usize,
    },
}

pub struct TiledFetch<'a, 't> {
    luma: &'a [u8],
    chroma: &'a [u8],
    map: TiledMap<'t>,
    luma_cache: WordCache,
    chroma_cache: WordCache,
}

impl<'a, 't> TiledFetch<'a, 't> {
    pub fn new(luma: &'a [u8], chroma: &'a [u8], map: TiledMap<'t>) -> Self {
        Self { luma, chroma, map, luma_cache: WordCache::default(), chroma_cache: WordCache::default() }
    }
}

impl PixelFetch for TiledFetch<'_, '_> {
    #[inline]
    fn luma(&mut self, x: usize, y: usize) -> u8 {
        let pos = match self.map {
            TiledMap::Detile(t) => t.luma.position(x as u32, y as u32) as usize,
            TiledMap::HalfTurn(t) => (t.luma_rows[y] + t.luma_cols[x]) as usize,
            TiledMap::QuarterTurn { luma, luma_first, width, .. } => luma[(y - luma_first) * width + x] as usize,
        };
        self.luma_cache.byte(self.luma, pos)
    }

    #[inline]
    fn chroma(&mut self, x: usize, y: usize) -> [u8; 2] {
        let pos = match self.map {
            TiledMap::Detile(t) => t.chroma.position(x as u32 * 2, y as u32) as usize,
            TiledMap::HalfTurn(t) => (t.chroma_rows[y] + t.chroma_cols[x]) as usize,
            TiledMap::QuarterTurn { chroma, chroma_first, width, .. } => {
                chroma[(y - chroma_first) * (width / 2) + x] as usize
            }
        };
        self.chroma_cache.pair(self.chroma, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant;

    impl PixelFetch for Constant {
        fn luma(&mut self, x: usize, y: usize) -> u8 {
            (10 * y + x) as u8
        }

        fn chroma(&mut self, x: usize, y: usize) -> [u8; 2] {
            [(100 + 10 * y + x) as u8, (200 + 10 * y + x) as u8]
        }
    }

    #[test]
    fn test_byte_order_is_y0_cb_y1_cr() {
        let mut out = vec![0; 4 * 2 * 3];
        pack_yuyv(&mut Constant, 1..4, 4, &mut out);
        assert_eq!(&out[..8], &[10, 100, 11, 200, 12, 101, 13, 201]);
        // Rows 2 and 3 share chroma row 1.
        assert_eq!(&out[8..16], &[20, 110, 21, 210, 22, 111, 23, 211]);
        assert_eq!(&out[16..], &[30, 110, 31, 210, 32, 111, 33, 211]);
    }

    #[test]
    fn test_linear_half_turn_fetch() {
        let luma: Vec<u8> = (0..16).collect();
        let chroma: Vec<u8> = (100..108).collect();
        let src = SourceFrame { luma: &luma, chroma: &chroma, stride: 4 };
        let mut fetch = LinearFetch::new(src, LinearMap::HalfTurn { source: Size::new(4, 4), skip: None });
        assert_eq!(fetch.luma(0, 0), 15);
        assert_eq!(fetch.luma(3, 3), 0);
        assert_eq!(fetch.chroma(0, 0), [106, 107]);
        assert_eq!(fetch.chroma(1, 1), [100, 101]);
    }
}
