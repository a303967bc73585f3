// SPDX-License-Identifier: MIT
// Geometry and table-builder failures. Kept dependency-free so the engine
// crate can wrap it in its own error type.

use crate::dims::Size;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// Source width or height is zero.
    EmptySource(Size),
    /// Source exceeds the panel the profile was built for.
    SourceTooLarge { source: Size, panel: Size },
    /// A computed target dimension collapsed to zero.
    DegenerateTarget { source: Size, target: Size },
    /// Line size is smaller than the row it has to hold, or not tile aligned.
    BadStride { stride: u32, width: u32, align: u32 },
    /// Fallible reservation for a lookup table failed.
    Allocation { table: &'static str, bytes: usize },
}

pub type GeometryResult<T> = Result<T, GeometryError>;

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::EmptySource(s) => {
                write!(f, "Source frame has an empty dimension ({}x{})", s.w, s.h)
            }
            GeometryError::SourceTooLarge { source, panel } => write!(
                f,
                "Source {}x{} exceeds panel maximum {}x{}",
                source.w, source.h, panel.w, panel.h
            ),
            GeometryError::DegenerateTarget { source, target } => write!(
                f,
                "Target {}x{} computed from {}x{} has an empty dimension",
                target.w, target.h, source.w, source.h
            ),
            GeometryError::BadStride { stride, width, align } => write!(
                f,
                "Line size {} invalid for width {} (alignment {})",
                stride, width, align
            ),
            GeometryError::Allocation { table, bytes } => {
                write!(f, "Failed to reserve {} bytes for {} table", bytes, table)
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// Reserve exactly `len` elements, reporting failure instead of aborting.
pub(crate) fn try_table<T>(table: &'static str, len: usize) -> GeometryResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| GeometryError::Allocation {
        table,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(v)
}
