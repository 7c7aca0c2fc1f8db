//! Terrain and feature catalog: maps compact [`TerrainId`] / [`FeatureId`]
//! values to their definitions.
//!
//! The catalog is built once at startup and shared read-only afterwards.
//! Persisted records refer to definitions by name, generators refer to them
//! by category or kind, and cells store the compact ids.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::GridError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact terrain identifier stored in each cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerrainId(pub u16);

/// Compact feature identifier stored in each cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub u16);

/// Terrain classes produced by world generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainCategory {
    /// Below sea level.
    Ocean,
    /// Inland water (rivers, lakes).
    Water,
    /// Dry land; the only category that carries features.
    Land,
}

/// Secondary objects that may occupy a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// A transit station.
    Station,
}

/// Descriptor for a terrain type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainDef {
    /// Unique persisted name (e.g. "ocean", "land").
    pub name: String,
    /// Generation category this terrain represents.
    pub category: TerrainCategory,
}

/// Descriptor for a feature type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Unique persisted name (e.g. "station").
    pub name: String,
    /// Feature kind this definition represents.
    pub kind: FeatureKind,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Registry of terrain and feature definitions.
///
/// Ids are dense indices into the definition tables, assigned in
/// registration order starting at 0. The first definition registered for a
/// category (or kind) is the one generation resolves to.
#[derive(Debug, Default)]
pub struct Catalog {
    terrains: Vec<TerrainDef>,
    features: Vec<FeatureDef>,
    terrain_by_name: FxHashMap<String, TerrainId>,
    feature_by_name: FxHashMap<String, FeatureId>,
    terrain_by_category: FxHashMap<TerrainCategory, TerrainId>,
    feature_by_kind: FxHashMap<FeatureKind, FeatureId>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with `ocean`, `water`, `land` and `station` registered.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for (name, category) in [
            ("ocean", TerrainCategory::Ocean),
            ("water", TerrainCategory::Water),
            ("land", TerrainCategory::Land),
        ] {
            // Names are distinct and the table is empty, so this cannot fail.
            let _ = catalog.register_terrain(TerrainDef {
                name: name.to_string(),
                category,
            });
        }
        let _ = catalog.register_feature(FeatureDef {
            name: "station".to_string(),
            kind: FeatureKind::Station,
        });
        catalog
    }

    /// Registers a terrain definition and returns its id.
    ///
    /// # Errors
    ///
    /// [`GridError::DuplicateName`] if the name is taken, or
    /// [`GridError::CatalogFull`] once every `u16` id is in use.
    pub fn register_terrain(&mut self, def: TerrainDef) -> Result<TerrainId, GridError> {
        if self.terrain_by_name.contains_key(&def.name) {
            return Err(GridError::DuplicateName {
                kind: "terrain",
                name: def.name,
            });
        }
        let id = u16::try_from(self.terrains.len())
            .map(TerrainId)
            .map_err(|_| GridError::CatalogFull("terrain"))?;

        self.terrain_by_name.insert(def.name.clone(), id);
        self.terrain_by_category.entry(def.category).or_insert(id);
        self.terrains.push(def);
        Ok(id)
    }

    /// Registers a feature definition and returns its id.
    ///
    /// # Errors
    ///
    /// Same conditions as [`register_terrain`](Self::register_terrain).
    pub fn register_feature(&mut self, def: FeatureDef) -> Result<FeatureId, GridError> {
        if self.feature_by_name.contains_key(&def.name) {
            return Err(GridError::DuplicateName {
                kind: "feature",
                name: def.name,
            });
        }
        let id = u16::try_from(self.features.len())
            .map(FeatureId)
            .map_err(|_| GridError::CatalogFull("feature"))?;

        self.feature_by_name.insert(def.name.clone(), id);
        self.feature_by_kind.entry(def.kind).or_insert(id);
        self.features.push(def);
        Ok(id)
    }

    /// Definition for a terrain id, or `None` if it was never issued.
    pub fn terrain(&self, id: TerrainId) -> Option<&TerrainDef> {
        self.terrains.get(id.0 as usize)
    }

    /// Definition for a feature id, or `None` if it was never issued.
    pub fn feature(&self, id: FeatureId) -> Option<&FeatureDef> {
        self.features.get(id.0 as usize)
    }

    /// Looks up a terrain id by its persisted name.
    pub fn terrain_by_name(&self, name: &str) -> Option<TerrainId> {
        self.terrain_by_name.get(name).copied()
    }

    /// Looks up a feature id by its persisted name.
    pub fn feature_by_name(&self, name: &str) -> Option<FeatureId> {
        self.feature_by_name.get(name).copied()
    }

    /// Terrain id that generation uses for `category`.
    pub fn terrain_for(&self, category: TerrainCategory) -> Option<TerrainId> {
        self.terrain_by_category.get(&category).copied()
    }

    /// Feature id that generation uses for `kind`.
    pub fn feature_for(&self, kind: FeatureKind) -> Option<FeatureId> {
        self.feature_by_kind.get(&kind).copied()
    }

    /// Number of registered terrain definitions.
    pub fn terrain_count(&self) -> usize {
        self.terrains.len()
    }

    /// Number of registered feature definitions.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_contents() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.terrain_count(), 3);
        assert_eq!(catalog.feature_count(), 1);

        let land = catalog.terrain_by_name("land").unwrap();
        assert_eq!(catalog.terrain(land).unwrap().category, TerrainCategory::Land);
        assert_eq!(catalog.terrain_for(TerrainCategory::Land), Some(land));

        let station = catalog.feature_for(FeatureKind::Station).unwrap();
        assert_eq!(catalog.feature(station).unwrap().name, "station");
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut catalog = Catalog::new();
        let a = catalog
            .register_terrain(TerrainDef {
                name: "sand".into(),
                category: TerrainCategory::Land,
            })
            .unwrap();
        let b = catalog
            .register_terrain(TerrainDef {
                name: "marsh".into(),
                category: TerrainCategory::Water,
            })
            .unwrap();
        assert_eq!(a, TerrainId(0));
        assert_eq!(b, TerrainId(1));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut catalog = Catalog::standard();
        let result = catalog.register_terrain(TerrainDef {
            name: "land".into(),
            category: TerrainCategory::Land,
        });
        assert!(matches!(
            result,
            Err(GridError::DuplicateName { kind: "terrain", .. })
        ));

        let result = catalog.register_feature(FeatureDef {
            name: "station".into(),
            kind: FeatureKind::Station,
        });
        assert!(matches!(
            result,
            Err(GridError::DuplicateName { kind: "feature", .. })
        ));
    }

    #[test]
    fn test_first_definition_wins_for_category() {
        let mut catalog = Catalog::standard();
        let land = catalog.terrain_for(TerrainCategory::Land).unwrap();
        let meadow = catalog
            .register_terrain(TerrainDef {
                name: "meadow".into(),
                category: TerrainCategory::Land,
            })
            .unwrap();
        assert_ne!(land, meadow);
        assert_eq!(catalog.terrain_for(TerrainCategory::Land), Some(land));
        assert_eq!(catalog.terrain_by_name("meadow"), Some(meadow));
    }

    #[test]
    fn test_unknown_lookups_return_none() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.terrain_by_name("lava"), None);
        assert_eq!(catalog.feature_by_name("depot"), None);
        assert!(catalog.terrain(TerrainId(99)).is_none());
        assert!(catalog.feature(FeatureId(99)).is_none());
    }
}
