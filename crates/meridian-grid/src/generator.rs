//! The seam between chunks and world generation.

use crate::catalog::{FeatureKind, TerrainCategory};
use crate::coords::WorldPos;

/// What generation decided for one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratedCell {
    /// Terrain category at the position.
    pub terrain: TerrainCategory,
    /// Feature to place, if any.
    pub feature: Option<FeatureKind>,
}

impl GeneratedCell {
    /// A cell of `terrain` with no feature.
    pub const fn bare(terrain: TerrainCategory) -> Self {
        Self {
            terrain,
            feature: None,
        }
    }
}

/// Produces the initial contents of never-persisted cells.
///
/// Terrain must be a pure function of the position for a given generator.
/// Closures `Fn(WorldPos) -> GeneratedCell` implement this trait.
pub trait CellGenerator: Send + Sync {
    /// Generates the cell at `position`.
    fn generate(&self, position: WorldPos) -> GeneratedCell;
}

impl<F> CellGenerator for F
where
    F: Fn(WorldPos) -> GeneratedCell + Send + Sync,
{
    fn generate(&self, position: WorldPos) -> GeneratedCell {
        self(position)
    }
}
