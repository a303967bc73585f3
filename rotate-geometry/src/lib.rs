// SPDX-License-Identifier: MIT
//! # rotate-geometry: Planning and Lookup Tables for 4:2:0 Frame Rotation
//!
//! This crate holds every piece of the rotation engine that is pure arithmetic:
//! no threads, no buffers, no logging. The engine crate feeds it source sizes and
//! gets back target sizes and immutable lookup tables it can share across workers.
//!
//! ## Key Components
//!
//! - [`dims`]: `Size`, `Degree` and the target-dimension computation (parity,
//!   aspect-preserving quarter-turn scaling, rotated area cap)
//! - [`presets`]: capability profiles describing what a given platform supports
//!   (tile geometry, packed output, skip factor, thread counts, affinity)
//! - [`tables`]: quarter-turn remap tables for linear (raster) planes
//! - [`tiled`]: tiled-surface addressing, tiled-to-linear and tiled-rotated tables
//!
//! ## Table Shape
//!
//! A quarter-turn is expressed as three offset arrays per plane so that the inner
//! loop is two loads and an add:
//!
//! ```text
//! dst[dst_row[y] + x] = src[src_col[x] + src_row[y]]
//! ```
//!
//! Chroma tables are expressed in 16-bit CbCr sample units.
//!
//! ## Usage Example
//!
//! ```rust
//! use rotate_geometry::dims::{compute_target_dimensions, Degree, Size};
//! use rotate_geometry::presets::CapabilityProfile;
//! use rotate_geometry::tables::build_quarter_turn;
//!
//! let profile = CapabilityProfile::generic();
//! let source = Size { w: 1920, h: 1080 };
//! let target = compute_target_dimensions(source, Degree::D90, false, &profile).unwrap();
//! assert_eq!(target, Size { w: 606, h: 1080 });
//!
//! let tables = build_quarter_turn(source, 1920, target, Degree::D90).unwrap();
//! assert_eq!(tables.luma.src_col.len(), 606);
//! ```

pub mod dims;
pub mod error;
pub mod presets;
pub mod tables;
pub mod tiled;

pub use dims::{Degree, Size};
pub use error::{GeometryError, GeometryResult};
