//! # Frame Buffer Manager
//!
//! Output planes are allocated once per open, sized for the largest frame the panel
//! can show, and rewritten in place for every frame. Nothing is allocated on the
//! per-frame path.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────┐  kernels   ┌──────────────────┐  publish   ┌──────────────────┐
//! │ worker pool  │──────────▶│ staging (system) │──────────▶│ display planes   │
//! └──────────────┘            └──────────────────┘            │ (system/mapped)  │
//!        │              direct mode: kernels write here       └──────────────────┘
//!        └──────────────────────────────────────────────────────────▲
//! ```
//!
//! - **Display planes** live in [`BufferMemory::System`] (heap) or
//!   [`BufferMemory::Mapped`] (a temp-file backed shared mapping that stands in for
//!   accelerator-visible memory).
//! - **Staging planes** are optional heap copies. Kernels scatter into system memory
//!   and one sequential copy moves the finished frame into display memory.
//!
//! Both modes produce byte-identical output.

use std::ops::{Deref, DerefMut};

use memmap2::{MmapMut, MmapOptions};
use rotate_geometry::Size;
use rotate_geometry::presets::{BufferMemory, OutputPacking};
use tracing::debug;

use crate::error::{RotateError, RotateResult};

/// Backing store of one plane.
#[derive(Debug)]
pub enum PlaneMemory {
    Heap(Vec<u8>),
    Mapped(MmapMut),
}

impl PlaneMemory {
    /// Zero-filled plane of `len` bytes.
    pub fn allocate(kind: BufferMemory, len: usize, resource: &str) -> RotateResult<Self> {
        match kind {
            BufferMemory::System => {
                let mut buf = Vec::new();
                buf.try_reserve_exact(len)
                    .map_err(|_| RotateError::allocation(resource, len))?;
                buf.resize(len, 0);
                Ok(PlaneMemory::Heap(buf))
            }
            BufferMemory::Mapped => {
                let file = tempfile::tempfile()
                    .map_err(|e| RotateError::io("create mapped plane file", e).with_context(resource.to_string()))?;
                file.set_len(len as u64)
                    .map_err(|e| RotateError::io("size mapped plane file", e).with_context(resource.to_string()))?;
                // SAFETY: the file is private to this process and never resized after mapping.
                let map = unsafe { MmapOptions::new().len(len).map_mut(&file) }
                    .map_err(|e| RotateError::io("map plane", e).with_context(resource.to_string()))?;
                Ok(PlaneMemory::Mapped(map))
            }
        }
    }

    pub fn kind(&self) -> BufferMemory {
        match self {
            PlaneMemory::Heap(_) => BufferMemory::System,
            PlaneMemory::Mapped(_) => BufferMemory::Mapped,
        }
    }
}

impl Deref for PlaneMemory {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            PlaneMemory::Heap(v) => v,
            PlaneMemory::Mapped(m) => m,
        }
    }
}

impl DerefMut for PlaneMemory {
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            PlaneMemory::Heap(v) => v,
            PlaneMemory::Mapped(m) => m,
        }
    }
}

/// What to allocate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSpec {
    pub panel: Size,
    pub output: OutputPacking,
    pub memory: BufferMemory,
    pub staging: bool,
}

impl BufferSpec {
    /// Bytes of plane 0: luma for planar output, the whole frame for YUYV.
    pub fn primary_len(&self) -> usize {
        self.panel.area() as usize * self.output.bytes_per_pixel() as usize
    }

    /// Bytes of the chroma plane, zero for packed output.
    pub fn chroma_len(&self) -> usize {
        match self.output {
            OutputPacking::Planar => self.panel.area() as usize / 2,
            OutputPacking::Yuyv => 0,
        }
    }
}

#[derive(Debug)]
struct PlaneSet {
    primary: PlaneMemory,
    chroma: Option<PlaneMemory>,
}

impl PlaneSet {
    fn allocate(spec: &BufferSpec, memory: BufferMemory, label: &str) -> RotateResult<Self> {
        let primary = PlaneMemory::allocate(memory, spec.primary_len(), &format!("{label} primary plane"))?;
        let chroma = match spec.chroma_len() {
            0 => None,
            len => Some(PlaneMemory::allocate(memory, len, &format!("{label} chroma plane"))?),
        };
        Ok(Self { primary, chroma })
    }

    fn planes_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        let chroma: &mut [u8] = self.chroma.as_deref_mut().unwrap_or_default();
        (&mut self.primary[..], chroma)
    }
}

/// Output planes of one rotation context.
#[derive(Debug)]
pub struct FrameBuffers {
    spec: BufferSpec,
    display: Option<PlaneSet>,
    staging: Option<PlaneSet>,
}

impl FrameBuffers {
    /// Allocate display (and, if requested, staging) planes for `spec`.
    ///
    /// On failure everything allocated so far is dropped before returning.
    pub fn acquire(spec: BufferSpec) -> RotateResult<Self> {
        let display = PlaneSet::allocate(&spec, spec.memory, "display")?;
        let staging = if spec.staging {
            Some(PlaneSet::allocate(&spec, BufferMemory::System, "staging")?)
        } else {
            None
        };
        debug!(
            panel = %spec.panel,
            primary = spec.primary_len(),
            chroma = spec.chroma_len(),
            memory = ?spec.memory,
            staging = spec.staging,
            "frame buffers acquired"
        );
        Ok(Self { spec, display: Some(display), staging })
    }

    pub fn spec(&self) -> &BufferSpec {
        &self.spec
    }

    pub fn is_acquired(&self) -> bool {
        self.display.is_some()
    }

    /// Planes the kernels write into: staging if present, display otherwise.
    pub fn work_planes(&mut self) -> RotateResult<(&mut [u8], &mut [u8])> {
        let set = match (self.staging.as_mut(), self.display.as_mut()) {
            (Some(staging), Some(_)) => staging,
            (None, Some(display)) => display,
            (_, None) => return Err(released("work_planes")),
        };
        Ok(set.planes_mut())
    }

    /// Copy the first `primary` / `chroma` bytes of staging into display memory.
    /// No-op in direct mode.
    pub fn publish(&mut self, primary: usize, chroma: usize) -> RotateResult<()> {
        let display = self.display.as_mut().ok_or_else(|| released("publish"))?;
        if let Some(staging) = self.staging.as_ref() {
            display.primary[..primary].copy_from_slice(&staging.primary[..primary]);
            if let (Some(dst), Some(src)) = (display.chroma.as_mut(), staging.chroma.as_ref()) {
                dst[..chroma].copy_from_slice(&src[..chroma]);
            }
        }
        Ok(())
    }

    /// Display planes as handed to the consumer.
    pub fn display_planes(&self) -> RotateResult<(&[u8], &[u8])> {
        let display = self.display.as_ref().ok_or_else(|| released("display_planes"))?;
        let chroma: &[u8] = display.chroma.as_deref().unwrap_or_default();
        Ok((&display.primary[..], chroma))
    }

    /// Drop every plane. Safe to call more than once.
    pub fn release(&mut self) {
        if self.display.take().is_some() {
            debug!("frame buffers released");
        }
        self.staging = None;
    }
}

fn released(operation: &str) -> RotateError {
    RotateError::state("released", operation, "frame buffers were released")
}
