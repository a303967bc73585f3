//! Synthetic NV12 frames for the CLI, the benchmark and tests.
//!
//! The gradient is deliberately asymmetric in both axes and in Cb versus Cr, so
//! a wrong rotation direction, a mirrored axis or swapped chroma channels all
//! change the output.

use rotate_geometry::tiled::{TileGeometry, TiledSurface};

use crate::error::{RotateError, RotateResult};
use crate::frame::FrameDescriptor;
use crate::processing::source::{LinearPlanes, TiledPlanes};

/// Padding bytes beyond the visible width.
const PAD: u8 = 0xEE;

/// A raster NV12 frame owning its planes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nv12Frame {
    pub width: u32,
    pub height: u32,
    /// Line size of both planes in bytes.
    pub stride: u32,
    pub luma: Vec<u8>,
    pub chroma: Vec<u8>,
}

impl Nv12Frame {
    /// Gradient frame; `stride` is raised to `width` if smaller.
    pub fn gradient(width: u32, height: u32, stride: u32, seed: u32) -> Self {
        let stride = stride.max(width) as usize;
        let (w, h) = (width as usize, height as usize);
        let seed = seed as usize;

        let mut luma = vec![PAD; stride * h];
        for y in 0..h {
            for x in 0..w {
                luma[y * stride + x] = ((x * 31 + y * 17 + seed) ^ ((x * y) >> 3)) as u8;
            }
        }
        let mut chroma = vec![PAD; stride * (h / 2)];
        for y in 0..h / 2 {
            for x in 0..w / 2 {
                chroma[y * stride + 2 * x] = (x * 5 + y * 11 + seed) as u8;
                chroma[y * stride + 2 * x + 1] = ((x * 13) ^ (y * 3 + seed)) as u8;
            }
        }
        Self { width, height, stride: stride as u32, luma, chroma }
    }

    /// Wrap a tightly packed NV12 buffer (`w*h` luma bytes followed by chroma).
    pub fn from_raw(mut data: Vec<u8>, width: u32, height: u32) -> RotateResult<Self> {
        let luma_len = width as usize * height as usize;
        let chroma_len = width as usize * (height as usize / 2);
        if data.len() < luma_len + chroma_len {
            return Err(RotateError::validation(
                "raw frame",
                format!("{} bytes for {width}x{height} NV12", luma_len + chroma_len),
                data.len().to_string(),
            ));
        }
        let chroma = data[luma_len..luma_len + chroma_len].to_vec();
        data.truncate(luma_len);
        Ok(Self { width, height, stride: width, luma: data, chroma })
    }

    pub fn descriptor(&self) -> FrameDescriptor<'_> {
        FrameDescriptor::nv12(&self.luma, &self.chroma, self.stride as usize, self.width, self.height)
    }

    pub fn planes(&self) -> LinearPlanes<'_> {
        LinearPlanes { luma: &self.luma, chroma: &self.chroma, stride: self.stride as usize }
    }

    /// Rewrite the frame in the decoder's tiled layout. The tiled stride is the
    /// width rounded up to whole tiles.
    pub fn to_tiled(&self, tile: TileGeometry) -> RotateResult<TiledFrame> {
        let stride = self.width.div_ceil(tile.width) * tile.width;
        let luma_surface = TiledSurface::new(tile, stride, self.height)?;
        let chroma_surface = TiledSurface::new(tile, stride, self.height / 2)?;

        let mut luma = vec![0; luma_surface.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                luma[luma_surface.offset(x, y) as usize] = self.luma[(y * self.stride + x) as usize];
            }
        }
        let mut chroma = vec![0; chroma_surface.len()];
        for y in 0..self.height / 2 {
            for x in 0..self.width & !1 {
                chroma[chroma_surface.offset(x, y) as usize] = self.chroma[(y * self.stride + x) as usize];
            }
        }
        Ok(TiledFrame { width: self.width, height: self.height, stride, luma, chroma, luma_surface, chroma_surface })
    }
}

/// A frame in tiled layout, as a tiled hardware decoder would emit it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TiledFrame {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub luma: Vec<u8>,
    pub chroma: Vec<u8>,
    pub luma_surface: TiledSurface,
    pub chroma_surface: TiledSurface,
}

impl TiledFrame {
    pub fn descriptor(&self) -> FrameDescriptor<'_> {
        FrameDescriptor::nv12(&self.luma, &self.chroma, self.stride as usize, self.width, self.height)
    }

    pub fn planes(&self) -> TiledPlanes<'_> {
        TiledPlanes {
            luma: &self.luma,
            chroma: &self.chroma,
            luma_surface: self.luma_surface,
            chroma_surface: self.chroma_surface,
        }
    }
}
