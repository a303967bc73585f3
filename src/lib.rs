//! # Frame Rotate
//!
//! Multithreaded rotation and scaling of decoded YCbCr 4:2:0 video frames for
//! panels mounted in portrait orientation.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `context`: Per-stream rotation context (open, apply, close)
//! - `handle`: Flat, null-tolerant entry points over the context
//! - `processing`: Per-band kernels for every angle and source layout
//! - `core`: Worker pool, lookup-table arena, output buffers and timing
//! - `config`: Stream configuration and validation
//! - `pattern`: Synthetic NV12 frames for tools and tests
//!
//! Target geometry, remap tables and capability profiles live in the
//! `rotate-geometry` workspace crate and are re-exported here.
//!
//! ## Example
//!
//! ```rust
//! use frame_rotate::pattern::Nv12Frame;
//! use frame_rotate::{Degree, RotateConfig, RotationContext};
//!
//! let mut ctx = RotationContext::new();
//! ctx.open(&RotateConfig::new(90, 1920, 1080)).unwrap();
//! assert_eq!(ctx.scaled_width(), 606);
//!
//! let frame = Nv12Frame::gradient(1920, 1080, 1920, 0);
//! let input = frame.descriptor();
//! let outcome = ctx.apply(&input, Degree::D90).unwrap();
//! assert!(outcome.is_done());
//! ```

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod frame;
pub mod handle;
pub mod pattern;
pub mod processing;

pub use config::RotateConfig;
pub use context::RotationContext;
pub use error::{ErrorSeverity, HasSeverity, RotateError, RotateResult};
pub use frame::{ApplyOutcome, ColorFormat, FrameDescriptor, FrameFlags};
pub use processing::Kernel;

/// Re-export the geometry crate's public surface
pub use rotate_geometry::presets::{CapabilityProfile, ProfilePreset};
pub use rotate_geometry::{Degree, Size};
