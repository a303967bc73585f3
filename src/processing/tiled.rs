//! Kernels for tiled NV12 sources with planar output.
//!
//! All reads go through aligned little-endian 64-bit words. Table entries are
//! tiled byte positions: `pos & !7` selects the word and `pos & 7` the byte lane.

use std::ops::Range;

use rotate_geometry::tiled::{Tiled180, TiledToLinear};

use crate::core::table_arena::DetileTables;
use crate::processing::{DstBand, KernelPlan, SourceFrame};

/// Load the aligned word starting at byte `index`.
#[inline]
pub fn load_word(plane: &[u8], index: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&plane[index..index + 8]);
    u64::from_le_bytes(bytes)
}

/// Remembers the last word read, so walking the lanes of one word costs one load.
#[derive(Clone, Copy, Debug)]
pub struct WordCache {
    index: usize,
    word: u64,
}

impl Default for WordCache {
    fn default() -> Self {
        Self { index: usize::MAX, word: 0 }
    }
}

impl WordCache {
    #[inline]
    pub fn byte(&mut self, plane: &[u8], pos: usize) -> u8 {
        let index = pos & !7;
        if index != self.index {
            self.word = load_word(plane, index);
            self.index = index;
        }
        (self.word >> ((pos & 7) * 8)) as u8
    }

    /// Cb and Cr of the sample at `pos`. Sample positions are even, so both
    /// bytes live in the same word.
    #[inline]
    pub fn pair(&mut self, plane: &[u8], pos: usize) -> [u8; 2] {
        [self.byte(plane, pos), self.byte(plane, pos + 1)]
    }
}

/// 0°: one word load per 8 output bytes.
pub fn detile(plan: &KernelPlan, tables: &DetileTables, src: &SourceFrame<'_>, dst: &mut DstBand<'_>) {
    let tw = plan.target.w as usize;
    detile_plane(&tables.luma, src.luma, dst.primary, dst.rows.luma.clone(), tw);
    detile_plane(&tables.chroma, src.chroma, dst.chroma, dst.rows.chroma.clone(), tw);
}

fn detile_plane(t2l: &TiledToLinear, plane: &[u8], out: &mut [u8], rows: Range<usize>, row_bytes: usize) {
    let words = t2l.words_per_row as usize;
    for (line, y) in out.chunks_exact_mut(row_bytes).zip(rows) {
        let offsets = &t2l.offsets[y * words..(y + 1) * words];
        for (chunk, &offset) in line.chunks_mut(8).zip(offsets) {
            let word = load_word(plane, offset as usize).to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }
}

/// 180°: destination rows are produced in pairs, which read two vertically
/// adjacent source rows of the same tile.
pub fn half_turn(plan: &KernelPlan, tables: &Tiled180, src: &SourceFrame<'_>, dst: &mut DstBand<'_>) {
    let tw = plan.target.w as usize;
    let luma = PlaneTables { rows: &tables.luma_rows, cols: &tables.luma_cols, sample: 1 };
    let chroma = PlaneTables { rows: &tables.chroma_rows, cols: &tables.chroma_cols, sample: 2 };
    luma.mirror(src.luma, dst.primary, dst.rows.luma.clone(), tw);
    chroma.mirror(src.chroma, dst.chroma, dst.rows.chroma.clone(), tw);
}

struct PlaneTables<'t> {
    rows: &'t [u32],
    cols: &'t [u32],
    sample: usize,
}

impl PlaneTables<'_> {
    fn mirror(&self, plane: &[u8], out: &mut [u8], rows: Range<usize>, row_bytes: usize) {
        let mut upper_cache = WordCache::default();
        let mut lower_cache = WordCache::default();
        let mut lines = out.chunks_exact_mut(row_bytes).zip(rows);
        while let Some((upper, y0)) = lines.next() {
            let r0 = self.rows[y0] as usize;
            match lines.next() {
                Some((lower, y1)) => {
                    let r1 = self.rows[y1] as usize;
                    for (x, &col) in self.cols.iter().enumerate() {
                        for k in 0..self.sample {
                            let d = x * self.sample + k;
                            upper[d] = upper_cache.byte(plane, r0 + col as usize + k);
                            lower[d] = lower_cache.byte(plane, r1 + col as usize + k);
                        }
                    }
                }
                None => {
                    for (x, &col) in self.cols.iter().enumerate() {
                        for k in 0..self.sample {
                            upper[x * self.sample + k] = upper_cache.byte(plane, r0 + col as usize + k);
                        }
                    }
                }
            }
        }
    }
}

/// 90° / 270°: `luma` and `chroma` are the flattened positions of exactly the
/// rows in the band.
pub fn quarter_turn(luma: &[u32], chroma: &[u32], src: &SourceFrame<'_>, dst: &mut DstBand<'_>) {
    let mut cache = WordCache::default();
    for (d, &pos) in dst.primary.iter_mut().zip(luma) {
        *d = cache.byte(src.luma, pos as usize);
    }
    let mut cache = WordCache::default();
    for (d, &pos) in dst.chroma.chunks_exact_mut(2).zip(chroma) {
        d.copy_from_slice(&cache.pair(src.chroma, pos as usize));
    }
}
