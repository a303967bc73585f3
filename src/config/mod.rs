//! # Configuration Module
//!
//! Stream parameters passed to `open`. Platform capabilities live in
//! [`rotate_geometry::presets::CapabilityProfile`].

pub mod config;

pub use config::RotateConfig;
