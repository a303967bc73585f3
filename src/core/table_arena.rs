//! Immutable lookup-table generations, one per rotation angle.
//!
//! Workers receive an `Arc<TableGeneration>` with every frame. Rebuilding tables
//! for a new geometry builds a fresh generation and swaps the `Arc`; workers still
//! holding the old one finish with it and drop it.

use std::collections::HashMap;
use std::sync::Arc;

use rotate_geometry::dims::SkipFactor;
use rotate_geometry::tables::{QuarterTurnTables, build_quarter_turn};
use rotate_geometry::tiled::{TileGeometry, Tiled180, TiledRotated, TiledSurface, TiledToLinear};
use rotate_geometry::{Degree, GeometryResult, Size};
use tracing::debug;

use crate::error::RotateResult;

/// Everything a generation depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub degree: Degree,
    pub source: Size,
    /// Source line size in bytes.
    pub stride: u32,
    pub target: Size,
    pub tile: Option<TileGeometry>,
    pub skip: Option<SkipFactor>,
}

impl TableKey {
    /// Luma and chroma surfaces of a tiled source.
    pub fn surfaces(&self) -> GeometryResult<Option<(TiledSurface, TiledSurface)>> {
        match self.tile {
            Some(tile) => Ok(Some((
                TiledSurface::new(tile, self.stride, self.source.h)?,
                TiledSurface::new(tile, self.stride, self.source.h / 2)?,
            ))),
            None => Ok(None),
        }
    }
}

/// Tiled-to-linear tables of both planes.
#[derive(Debug, PartialEq, Eq)]
pub struct DetileTables {
    pub luma: TiledToLinear,
    pub chroma: TiledToLinear,
}

#[derive(Debug)]
pub struct TableGeneration {
    pub id: u64,
    pub key: TableKey,
    /// Quarter turns only.
    pub remap: Option<QuarterTurnTables>,
    /// Tiled sources only, shared across angles.
    pub detile: Option<Arc<DetileTables>>,
    pub tiled_rotated: Option<TiledRotated>,
    pub tiled_180: Option<Tiled180>,
}

#[derive(Debug, Default)]
pub struct TableArena {
    generations: HashMap<Degree, Arc<TableGeneration>>,
    detile: Option<Arc<DetileTables>>,
    next_id: u64,
}

impl TableArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation for `key`, building it only if the cached one for that angle
    /// was built for a different geometry.
    pub fn ensure(&mut self, key: TableKey) -> RotateResult<Arc<TableGeneration>> {
        if let Some(existing) = self.generations.get(&key.degree) {
            if existing.key == key {
                return Ok(Arc::clone(existing));
            }
        }

        let generation = Arc::new(self.build(key)?);
        debug!(
            id = generation.id,
            degree = key.degree.degrees(),
            source = %key.source,
            target = %key.target,
            tiled = key.tile.is_some(),
            "lookup tables built"
        );
        self.generations.insert(key.degree, Arc::clone(&generation));
        Ok(generation)
    }

    pub fn get(&self, degree: Degree) -> Option<&Arc<TableGeneration>> {
        self.generations.get(&degree)
    }

    /// Number of generations built since creation.
    pub fn builds(&self) -> u64 {
        self.next_id
    }

    fn build(&mut self, key: TableKey) -> RotateResult<TableGeneration> {
        let remap = if key.degree.is_quarter_turn() {
            Some(build_quarter_turn(key.source, key.stride, key.target, key.degree)?)
        } else {
            None
        };

        let (mut detile, mut tiled_rotated, mut tiled_180) = (None, None, None);
        if let Some((luma, chroma)) = key.surfaces()? {
            let tables = self.detile_for(luma, chroma, key.source)?;
            if let Some(remap) = remap.as_ref() {
                tiled_rotated = Some(TiledRotated::build(remap, &tables.luma, &tables.chroma)?);
            }
            if key.degree == Degree::D180 {
                tiled_180 = Some(Tiled180::build(key.source, key.target, key.skip, &luma, &chroma)?);
            }
            detile = Some(tables);
        }

        let id = self.next_id;
        self.next_id += 1;
        Ok(TableGeneration { id, key, remap, detile, tiled_rotated, tiled_180 })
    }

    fn detile_for(
        &mut self,
        luma: TiledSurface,
        chroma: TiledSurface,
        source: Size,
    ) -> RotateResult<Arc<DetileTables>> {
        if let Some(existing) = &self.detile {
            if existing.luma.surface == luma
                && existing.chroma.surface == chroma
                && existing.luma.rows == source.h
            {
                return Ok(Arc::clone(existing));
            }
        }
        let tables = Arc::new(DetileTables {
            luma: TiledToLinear::build(luma, source.h)?,
            chroma: TiledToLinear::build(chroma, source.h / 2)?,
        });
        self.detile = Some(Arc::clone(&tables));
        Ok(tables)
    }
}
