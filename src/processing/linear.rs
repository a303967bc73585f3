//! Kernels for raster (linear) NV12 sources with planar output.

use rotate_geometry::dims::skip_index;
use rotate_geometry::presets::Traversal;
use rotate_geometry::tables::{PlaneRemap, QuarterTurnTables};

use crate::processing::{DstBand, KernelPlan, SourceFrame, average, field_pair};

/// 0°: copy visible rows, dropping the source line padding.
pub fn copy(plan: &KernelPlan, src: &SourceFrame<'_>, dst: &mut DstBand<'_>) {
    let tw = plan.target.w as usize;
    for (out, y) in dst.primary.chunks_exact_mut(tw).zip(dst.rows.luma.clone()) {
        let start = y * src.stride;
        out.copy_from_slice(&src.luma[start..start + tw]);
    }
    for (out, y) in dst.chroma.chunks_exact_mut(tw).zip(dst.rows.chroma.clone()) {
        let start = y * src.stride;
        out.copy_from_slice(&src.chroma[start..start + tw]);
    }
}

/// Source lines feeding destination row `y` of a 180° plane with `h` lines.
fn mirrored_lines(plan: &KernelPlan, h: usize, y: usize) -> (usize, usize) {
    let r = h - 1 - skip_index(plan.skip, y);
    if plan.blend { field_pair(r, h) } else { (r, r) }
}

/// 180°: point reflection through the frame center, optionally subsampled by the
/// skip factor and blended across the field pair.
pub fn half_turn(plan: &KernelPlan, src: &SourceFrame<'_>, dst: &mut DstBand<'_>) {
    let (sw, sh) = (plan.source.w as usize, plan.source.h as usize);
    let tw = plan.target.w as usize;
    let direct = plan.skip.is_none();

    for (out, y) in dst.primary.chunks_exact_mut(tw).zip(dst.rows.luma.clone()) {
        let (a, b) = mirrored_lines(plan, sh, y);
        let upper = &src.luma[a * src.stride..a * src.stride + sw];
        let lower = &src.luma[b * src.stride..b * src.stride + sw];
        if direct && a == b {
            for (d, s) in out.iter_mut().zip(upper.iter().rev()) {
                *d = *s;
            }
        } else {
            for (x, d) in out.iter_mut().enumerate() {
                let sx = sw - 1 - skip_index(plan.skip, x);
                *d = average(upper[sx], lower[sx]);
            }
        }
    }

    let sc = plan.source.chroma();
    let (cw, ch) = (sc.w as usize, sc.h as usize);
    for (out, y) in dst.chroma.chunks_exact_mut(tw).zip(dst.rows.chroma.clone()) {
        let (a, b) = mirrored_lines(plan, ch, y);
        let upper = &src.chroma[a * src.stride..a * src.stride + cw * 2];
        let lower = &src.chroma[b * src.stride..b * src.stride + cw * 2];
        if direct && a == b {
            for (d, s) in out.chunks_exact_mut(2).zip(upper.chunks_exact(2).rev()) {
                d.copy_from_slice(s);
            }
        } else {
            for (x, d) in out.chunks_exact_mut(2).enumerate() {
                let sx = (cw - 1 - skip_index(plan.skip, x)) * 2;
                d[0] = average(upper[sx], lower[sx]);
                d[1] = average(upper[sx + 1], lower[sx + 1]);
            }
        }
    }
}

/// 90° / 270° through the remap tables.
pub fn quarter_turn(plan: &KernelPlan, tables: &QuarterTurnTables, src: &SourceFrame<'_>, dst: &mut DstBand<'_>) {
    let tw = plan.target.w as usize;
    let (luma, chroma) = (&tables.luma, &tables.chroma);
    let (luma_rows, chroma_rows) = (dst.rows.luma.clone(), dst.rows.chroma.clone());

    if plan.blend {
        for (out, y) in dst.primary.chunks_exact_mut(tw).zip(luma_rows) {
            let row = luma.src_row[y] as usize;
            for (d, (&col, &pair)) in out.iter_mut().zip(luma.src_col.iter().zip(&luma.src_col_pair)) {
                *d = average(src.luma[col as usize + row], src.luma[pair as usize + row]);
            }
        }
        for (out, y) in dst.chroma.chunks_exact_mut(tw).zip(chroma_rows) {
            let row = chroma.src_row[y] as usize;
            for (d, (&col, &pair)) in out.chunks_exact_mut(2).zip(chroma.src_col.iter().zip(&chroma.src_col_pair)) {
                let (s, p) = ((col as usize + row) * 2, (pair as usize + row) * 2);
                d[0] = average(src.chroma[s], src.chroma[p]);
                d[1] = average(src.chroma[s + 1], src.chroma[p + 1]);
            }
        }
        return;
    }

    match plan.traversal {
        Traversal::RowMajor => {
            for (out, y) in dst.primary.chunks_exact_mut(tw).zip(luma_rows) {
                let row = luma.src_row[y] as usize;
                for (d, &col) in out.iter_mut().zip(&luma.src_col) {
                    *d = src.luma[col as usize + row];
                }
            }
            for (out, y) in dst.chroma.chunks_exact_mut(tw).zip(chroma_rows) {
                let row = chroma.src_row[y] as usize;
                for (d, &col) in out.chunks_exact_mut(2).zip(&chroma.src_col) {
                    let s = (col as usize + row) * 2;
                    d.copy_from_slice(&src.chroma[s..s + 2]);
                }
            }
        }
        Traversal::ColumnMajor => {
            columns(luma, src.luma, dst.primary, luma_rows.start, tw, 1);
            columns(chroma, src.chroma, dst.chroma, chroma_rows.start, tw, 2);
        }
    }
}

/// Column-outer walk: one source line at a time, so consecutive reads stay on it.
fn columns(remap: &PlaneRemap, plane: &[u8], out: &mut [u8], first_row: usize, row_bytes: usize, sample: usize) {
    let rows = out.len() / row_bytes;
    for (x, &col) in remap.src_col.iter().enumerate() {
        for i in 0..rows {
            let s = (col as usize + remap.src_row[first_row + i] as usize) * sample;
            let d = i * row_bytes + x * sample;
            out[d..d + sample].copy_from_slice(&plane[s..s + sample]);
        }
    }
}
