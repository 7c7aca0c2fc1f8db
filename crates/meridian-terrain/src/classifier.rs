//! Terrain classification and feature placement.
//!
//! Two independent [`NoiseField`] channels drive classification:
//!
//! ```text
//! elevation = 0.5 + 0.5 * sample(seed,        p, elevation params)
//! moisture  = 0.5 + 0.5 * sample(seed + salt, p, moisture params)
//!
//! elevation < sea_level                                    -> Ocean
//! moisture > river_threshold && elevation < lake_threshold -> Water
//! otherwise                                                -> Land
//! ```
//!
//! Land cells then receive a station with probability `feature_probability`.

use meridian_grid::{CellGenerator, FeatureKind, GeneratedCell, TerrainCategory, WorldPos};
use rand::Rng;

use crate::error::TerrainError;
use crate::noise_field::{NoiseField, NoiseParams};
use crate::seed::{MOISTURE_SALT, cell_rng, channel_seed};

/// Source of the random draw behind feature placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeaturePlacement {
    /// Thread-local RNG; the same cell may differ between generations.
    #[default]
    Unseeded,
    /// RNG derived from the world seed and cell position; reproducible.
    Seeded,
}

/// Generation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierParams {
    /// World seed.
    pub seed: i64,
    /// Horizontal noise scale in cells.
    pub scale: f64,
    /// Elevation channel octaves.
    pub elevation: NoiseParams,
    /// Moisture channel octaves.
    pub moisture: NoiseParams,
    /// Elevation below which a cell is ocean.
    pub sea_level: f64,
    /// Moisture above which low land becomes water.
    pub river_threshold: f64,
    /// Elevation below which wet land becomes water.
    pub lake_threshold: f64,
    /// Probability of a station on a land cell.
    pub feature_probability: f64,
    /// Feature placement mode.
    pub feature_placement: FeaturePlacement,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 100.0,
            elevation: NoiseParams::default(),
            moisture: NoiseParams {
                octaves: 2,
                ..NoiseParams::default()
            },
            sea_level: 0.5,
            river_threshold: 0.6,
            lake_threshold: 0.55,
            feature_probability: 0.1,
            feature_placement: FeaturePlacement::Unseeded,
        }
    }
}

impl ClassifierParams {
    /// Checks every parameter is within its valid range.
    pub fn validate(&self) -> Result<(), TerrainError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(TerrainError::invalid(
                "scale",
                format!("must be positive, got {}", self.scale),
            ));
        }
        self.elevation.validate("elevation")?;
        self.moisture.validate("moisture")?;
        for (name, value) in [
            ("sea_level", self.sea_level),
            ("river_threshold", self.river_threshold),
            ("lake_threshold", self.lake_threshold),
            ("feature_probability", self.feature_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TerrainError::invalid(
                    name,
                    format!("{value} is outside [0, 1]"),
                ));
            }
        }
        Ok(())
    }
}

/// Classifies world positions into terrain and places features.
#[derive(Clone, Debug)]
pub struct TerrainClassifier {
    params: ClassifierParams,
    elevation: NoiseField,
    moisture: NoiseField,
}

impl TerrainClassifier {
    /// Builds a classifier.
    ///
    /// # Errors
    ///
    /// [`TerrainError::InvalidParameter`] if `params` fails validation.
    pub fn new(params: ClassifierParams) -> Result<Self, TerrainError> {
        params.validate()?;
        let elevation = NoiseField::new(params.seed, params.scale)?;
        let moisture = NoiseField::new(channel_seed(params.seed, MOISTURE_SALT), params.scale)?;
        tracing::debug!(
            seed = params.seed,
            scale = params.scale,
            placement = ?params.feature_placement,
            "terrain classifier ready"
        );
        Ok(Self {
            params,
            elevation,
            moisture,
        })
    }

    /// Parameters in use.
    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    /// Normalized elevation in `[0, 1]`.
    pub fn elevation(&self, position: WorldPos) -> f64 {
        0.5 + 0.5 * self.elevation.sample(position, &self.params.elevation)
    }

    /// Normalized moisture in `[0, 1]`.
    pub fn moisture(&self, position: WorldPos) -> f64 {
        0.5 + 0.5 * self.moisture.sample(position, &self.params.moisture)
    }

    /// Terrain category at `position`. Pure for a fixed seed.
    pub fn terrain_at(&self, position: WorldPos) -> TerrainCategory {
        let elevation = self.elevation(position);
        if elevation < self.params.sea_level {
            return TerrainCategory::Ocean;
        }
        let moisture = self.moisture(position);
        if moisture > self.params.river_threshold && elevation < self.params.lake_threshold {
            TerrainCategory::Water
        } else {
            TerrainCategory::Land
        }
    }

    /// Decides whether a cell of `terrain` at `position` gets a feature.
    pub fn feature_at(&self, position: WorldPos, terrain: TerrainCategory) -> Option<FeatureKind> {
        if terrain != TerrainCategory::Land || self.params.feature_probability <= 0.0 {
            return None;
        }
        let draw: f64 = match self.params.feature_placement {
            FeaturePlacement::Unseeded => rand::random(),
            FeaturePlacement::Seeded => cell_rng(self.params.seed, position).random(),
        };
        (draw < self.params.feature_probability).then_some(FeatureKind::Station)
    }

    /// Terrain and feature for `position`.
    pub fn classify(&self, position: WorldPos) -> (TerrainCategory, Option<FeatureKind>) {
        let terrain = self.terrain_at(position);
        (terrain, self.feature_at(position, terrain))
    }
}

impl CellGenerator for TerrainClassifier {
    fn generate(&self, position: WorldPos) -> GeneratedCell {
        let (terrain, feature) = self.classify(position);
        GeneratedCell { terrain, feature }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
