//! Multi-octave coherent noise sampler.
//!
//! Composites several layers of Perlin noise, each successive layer sampled
//! at `lacunarity` times the frequency and weighted by `persistence` times
//! the amplitude of the previous one. The sum is normalized by the total
//! amplitude, so results stay in `[-1, 1]`.

use meridian_grid::WorldPos;
use noise::{NoiseFn, Perlin};

use crate::error::TerrainError;
use crate::seed::{mix64, seed_offset};

/// Octave configuration for one noise channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseParams {
    /// Number of layers to composite.
    pub octaves: u32,
    /// Amplitude multiplier between successive layers.
    pub persistence: f64,
    /// Frequency multiplier between successive layers.
    pub lacunarity: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl NoiseParams {
    /// Rejects zero octaves and non-positive or non-finite multipliers.
    pub fn validate(&self, channel: &'static str) -> Result<(), TerrainError> {
        if self.octaves == 0 {
            return Err(TerrainError::invalid(channel, "octaves must be at least 1"));
        }
        if !(self.persistence.is_finite() && self.persistence > 0.0) {
            return Err(TerrainError::invalid(
                channel,
                format!("persistence must be positive, got {}", self.persistence),
            ));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 0.0) {
            return Err(TerrainError::invalid(
                channel,
                format!("lacunarity must be positive, got {}", self.lacunarity),
            ));
        }
        Ok(())
    }

    /// Sum of all layer amplitudes (geometric series in `persistence`).
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amplitude = 1.0;
        for _ in 0..self.octaves {
            sum += amplitude;
            amplitude *= self.persistence;
        }
        sum
    }
}

/// Seeded coherent noise over the world grid.
///
/// A pure function of `(seed, position, params)`: two fields built from the
/// same seed and scale always return identical samples.
#[derive(Clone, Debug)]
pub struct NoiseField {
    perlin: Perlin,
    offset: (f64, f64),
    scale: f64,
    seed: i64,
}

impl NoiseField {
    /// Creates a field for `seed`. `scale` is the horizontal size, in cells,
    /// of one base-frequency noise period.
    ///
    /// # Errors
    ///
    /// [`TerrainError::InvalidParameter`] if `scale` is not a positive finite
    /// number.
    pub fn new(seed: i64, scale: f64) -> Result<Self, TerrainError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(TerrainError::invalid(
                "scale",
                format!("must be positive, got {scale}"),
            ));
        }
        Ok(Self {
            perlin: Perlin::new(mix64(seed as u64) as u32),
            offset: seed_offset(seed),
            scale,
            seed,
        })
    }

    /// Seed this field was built with.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Horizontal scale in cells.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Samples the field at `position`. Returns a value in `[-1, 1]`, or
    /// `0.0` when `params.octaves` is zero.
    pub fn sample(&self, position: WorldPos, params: &NoiseParams) -> f64 {
        self.sample_point(position.x as f64, position.y as f64, params)
    }

    /// Samples at a continuous position.
    pub fn sample_point(&self, x: f64, y: f64, params: &NoiseParams) -> f64 {
        if params.octaves == 0 {
            return 0.0;
        }

        let base_x = (x + self.offset.0) / self.scale;
        let base_y = (y + self.offset.1) / self.scale;

        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..params.octaves {
            let layer = self.perlin.get([base_x * frequency, base_y * frequency]);
            total += layer.clamp(-1.0, 1.0) * amplitude;
            max_amplitude += amplitude;

            frequency *= params.lacunarity;
            amplitude *= params.persistence;
        }

        if max_amplitude > 0.0 {
            (total / max_amplitude).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
