//! Procedural terrain: seeded multi-octave noise, terrain classification,
//! and feature placement for the chunked grid.

mod classifier;
mod error;
mod noise_field;

pub mod seed;

pub use classifier::{ClassifierParams, FeaturePlacement, TerrainClassifier};
pub use error::TerrainError;
pub use noise_field::{NoiseField, NoiseParams};
