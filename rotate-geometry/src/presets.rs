// SPDX-License-Identifier: MIT
//! # Capability Profiles
//!
//! A [`CapabilityProfile`] collects every platform-dependent knob of the rotation
//! engine into one value: panel limits, which codecs deliver tiled surfaces, whether
//! a packed YUYV fast path exists, how many workers to run and where to pin them.
//! The engine reads the profile once at open time; nothing else branches on the
//! platform.
//!
//! ## Shipped Presets
//!
//! | Preset | Source layout | Output | Notes |
//! |--------|---------------|--------|-------|
//! | `generic` | linear | planar NV12 | heap buffers, row-major traversal |
//! | `tiled` | 16×32 tiled for hardware codecs | planar NV12 | mapped display buffers, staging copy, per-worker tables |
//! | `packed-panel` | 16×32 tiled | YUYV at 1920×1080 | fixed 404×720 quarter-turn target, 2/3 skip on 180° |

use crate::dims::{SkipFactor, Size};
use crate::tiled::TileGeometry;

/// Codec identifiers as reported by the decoder (libavcodec numbering).
pub mod codec {
    pub const MPEG2: i32 = 2;
    pub const H264: i32 = 27;
    pub const VP9: i32 = 167;
    pub const HEVC: i32 = 173;
}

/// Layout of the frames the engine hands downstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputPacking {
    /// Y plane followed by interleaved CbCr plane.
    #[default]
    Planar,
    /// Interleaved `Y0 Cb Y1 Cr`, two bytes per pixel.
    Yuyv,
}

impl OutputPacking {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            OutputPacking::Planar => 1,
            OutputPacking::Yuyv => 2,
        }
    }
}

/// Fast path enabled for exactly one source resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizedMode {
    pub source: Size,
    /// Quarter-turn target used instead of the computed one.
    pub rotated_target: Size,
    pub output: OutputPacking,
}

/// Loop order for quarter-turn kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Traversal {
    /// Destination rows outer, columns inner.
    #[default]
    RowMajor,
    /// Destination columns outer, rows inner. Walks source rows sequentially.
    ColumnMajor,
}

/// How workers read the tiled lookup tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TableSharing {
    #[default]
    Shared,
    /// Each worker copies the rows it owns into private memory.
    PerWorkerCopy,
}

/// Memory the display-visible output planes live in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BufferMemory {
    #[default]
    System,
    /// File-backed shared mapping, standing in for accelerator memory.
    Mapped,
}

/// CPU placement for worker threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AffinityPolicy {
    #[default]
    None,
    /// Worker `i` is pinned to core `i % core_count`.
    RoundRobin { core_count: usize },
}

impl AffinityPolicy {
    pub fn core_for(self, worker: usize) -> Option<usize> {
        match self {
            AffinityPolicy::None => None,
            AffinityPolicy::RoundRobin { core_count: 0 } => None,
            AffinityPolicy::RoundRobin { core_count } => Some(worker % core_count),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThreadPriority {
    #[default]
    Normal,
    /// FIFO real-time scheduling at the given priority.
    RealTime(i32),
}

/// Everything the engine needs to know about the platform it runs on.
#[derive(Clone, Debug, PartialEq)]
pub struct CapabilityProfile {
    pub name: &'static str,
    /// Largest source accepted by `open` and the size display buffers are allocated for.
    pub panel: Size,
    /// Largest source `can_support` reports as playable.
    pub max_source: Size,
    pub rotated_area_cap: u64,
    pub low_res_swap: bool,
    pub low_res_limit: Size,
    /// Pixels trimmed from the swapped width on the low-resolution path.
    pub low_res_trim: u32,
    pub tile: Option<TileGeometry>,
    /// Codecs whose decoder emits tiled surfaces.
    pub tiled_codecs: Vec<i32>,
    pub optimized: Option<OptimizedMode>,
    pub skip_factor: Option<SkipFactor>,
    pub traversal: Traversal,
    pub table_sharing: TableSharing,
    pub display_memory: BufferMemory,
    /// Write through system-memory staging planes and copy once per frame.
    pub staging: bool,
    /// Workers for sources at or above 1280×720.
    pub threads_hd: usize,
    pub threads_sd: usize,
    pub affinity: AffinityPolicy,
    pub priority: ThreadPriority,
    pub max_fps: u32,
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        Self::generic()
    }
}

impl CapabilityProfile {
    /// Linear sources, planar output, no platform fast paths.
    pub fn generic() -> Self {
        Self {
            name: "generic",
            panel: Size::new(1920, 1080),
            max_source: Size::new(1920, 1088),
            rotated_area_cap: 606 * 1080,
            low_res_swap: true,
            low_res_limit: Size::new(720, 480),
            low_res_trim: 0,
            tile: None,
            tiled_codecs: Vec::new(),
            optimized: None,
            skip_factor: None,
            traversal: Traversal::RowMajor,
            table_sharing: TableSharing::Shared,
            display_memory: BufferMemory::System,
            staging: false,
            threads_hd: 4,
            threads_sd: 2,
            affinity: AffinityPolicy::None,
            priority: ThreadPriority::Normal,
            max_fps: 60,
        }
    }

    /// Hardware decoders that emit 16×32 tiled NV12.
    pub fn tiled() -> Self {
        Self {
            name: "tiled",
            tile: Some(TileGeometry::TILE_16X32),
            tiled_codecs: vec![codec::MPEG2, codec::H264, codec::HEVC],
            traversal: Traversal::ColumnMajor,
            table_sharing: TableSharing::PerWorkerCopy,
            display_memory: BufferMemory::Mapped,
            staging: true,
            affinity: AffinityPolicy::RoundRobin { core_count: 4 },
            ..Self::generic()
        }
    }

    /// Tiled decoder feeding a panel that scans out YUYV at full HD.
    pub fn packed_panel() -> Self {
        Self {
            name: "packed-panel",
            optimized: Some(OptimizedMode {
                source: Size::new(1920, 1080),
                rotated_target: Size::new(404, 720),
                output: OutputPacking::Yuyv,
            }),
            skip_factor: Some(SkipFactor::TwoThirds),
            low_res_trim: 8,
            threads_hd: 6,
            affinity: AffinityPolicy::RoundRobin { core_count: 6 },
            ..Self::tiled()
        }
    }

    /// Whether frames from `codec` arrive tiled on this platform.
    pub fn is_tiled_codec(&self, codec: i32) -> bool {
        self.tile.is_some() && self.tiled_codecs.contains(&codec)
    }

    /// The optimization-mode descriptor when `orig` is its resolution.
    pub fn optimized_for(&self, orig: Size) -> Option<&OptimizedMode> {
        self.optimized.as_ref().filter(|m| m.source == orig)
    }

    /// Fixed quarter-turn target for `orig`, if optimization mode applies.
    pub fn optimized_target(&self, orig: Size) -> Option<Size> {
        self.optimized_for(orig).map(|m| m.rotated_target)
    }

    pub fn output_for(&self, orig: Size) -> OutputPacking {
        self.optimized_for(orig).map(|m| m.output).unwrap_or_default()
    }

    pub fn worker_count(&self, orig: Size) -> usize {
        let n = if orig.area() >= Size::new(1280, 720).area() {
            self.threads_hd
        } else {
            self.threads_sd
        };
        n.max(1)
    }
}

/// Named profiles selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ProfilePreset {
    /// Linear NV12 in, planar NV12 out
    Generic,
    /// 16x32 tiled hardware-decoder surfaces
    Tiled,
    /// Tiled input with the full-HD YUYV panel fast path
    #[clap(name = "packed-panel")]
    PackedPanel,
}

impl ProfilePreset {
    pub fn to_profile(self) -> CapabilityProfile {
        match self {
            ProfilePreset::Generic => CapabilityProfile::generic(),
            ProfilePreset::Tiled => CapabilityProfile::tiled(),
            ProfilePreset::PackedPanel => CapabilityProfile::packed_panel(),
        }
    }
}
