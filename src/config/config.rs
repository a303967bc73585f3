//! # Stream Configuration
//!
//! [`RotateConfig`] carries the per-stream parameters a decoder reports when a
//! stream starts: size, line size, codec, scan type and the requested rotation.
//! It is the argument of [`RotationContext::open`](crate::RotationContext::open).
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `enable` | `bool` | | `false` passes frames through untouched |
//! | `degree` | `u32` | 0/90/180/270 | anything else means 0 |
//! | `width`, `height` | `u32` | 1..=panel | source size in pixels |
//! | `codec` | `i32` | | decoder codec id, selects tiled input on capable profiles |
//! | `interlaced` | `bool` | | enables field-pair blending |
//! | `line_size` | `u32` | 0 or >= width | bytes per source row, 0 means `width` |
//!
//! ## Examples
//!
//! ```rust
//! use frame_rotate::config::RotateConfig;
//!
//! let config = RotateConfig::new(90, 1920, 1080);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.effective_line_size(), 1920);
//! ```

use rotate_geometry::{Degree, Size};

use crate::error::{RotateError, RotateResult};

/// Parameters of one decoded stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotateConfig {
    /// Rotation enabled for this stream.
    pub enable: bool,

    /// Requested clockwise rotation in degrees.
    pub degree: u32,

    /// Source width in pixels.
    pub width: u32,

    /// Source height in pixels.
    pub height: u32,

    /// Decoder codec id (see [`rotate_geometry::presets::codec`]).
    pub codec: i32,

    /// Source is interlaced (two fields woven into each frame).
    pub interlaced: bool,

    /// Source line size in bytes for both planes. Zero means tightly packed.
    pub line_size: u32,
}

impl Default for RotateConfig {
    /// Enabled, 0°, 1920×1080 tightly packed progressive H.264.
    fn default() -> Self {
        Self {
            enable: true,
            degree: 0,
            width: 1920,
            height: 1080,
            codec: rotate_geometry::presets::codec::H264,
            interlaced: false,
            line_size: 0,
        }
    }
}

impl RotateConfig {
    /// Enabled, progressive, tightly packed stream of the given size.
    pub fn new(degree: u32, width: u32, height: u32) -> Self {
        Self { degree, width, height, ..Self::default() }
    }

    pub fn with_line_size(mut self, line_size: u32) -> Self {
        self.line_size = line_size;
        self
    }

    pub fn with_codec(mut self, codec: i32) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_interlaced(mut self, interlaced: bool) -> Self {
        self.interlaced = interlaced;
        self
    }

    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    pub fn source_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn normalized_degree(&self) -> Degree {
        Degree::from_degrees(self.degree)
    }

    /// Line size in bytes, falling back to the width.
    pub fn effective_line_size(&self) -> u32 {
        if self.line_size == 0 { self.width } else { self.line_size }
    }

    /// Checks that do not depend on the capability profile.
    ///
    /// Size limits are enforced by the geometry stage at open time.
    pub fn validate(&self) -> RotateResult<()> {
        if self.line_size != 0 && self.line_size < self.width {
            return Err(RotateError::validation(
                "line_size",
                "must be 0 or at least the width",
                self.line_size.to_string(),
            ));
        }
        // A tightly packed odd width is an odd line size too.
        let line_size = self.effective_line_size();
        if line_size % 2 != 0 {
            return Err(RotateError::validation(
                "line_size",
                "must be even so chroma rows hold whole CbCr samples",
                line_size.to_string(),
            ));
        }
        Ok(())
    }
}
