//! Deterministic seed derivation.
//!
//! Provides per-channel seed salting, per-cell RNG derivation from a world
//! seed and cell position, and the world-space offset a seed shifts noise
//! sampling by.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use meridian_grid::WorldPos;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Salt added to the world seed for the moisture channel.
pub const MOISTURE_SALT: i64 = 1000;

/// Salt mixed into per-cell feature RNG seeds.
pub const FEATURE_SALT: u64 = 0x6665_6174_7572_6573;

/// Range of the per-seed sampling offset on each axis.
const OFFSET_RANGE: f64 = 65_536.0;

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

/// Seed of a noise channel derived from the world seed.
pub fn channel_seed(world_seed: i64, salt: i64) -> i64 {
    world_seed.wrapping_add(salt)
}

/// SplitMix64 finalizer; spreads nearby seeds far apart.
pub fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// World-space offset applied to sampling positions for `seed`.
///
/// Each component lies in `[0, 65536)` so offset positions stay well within
/// `f64` precision whatever the seed.
pub fn seed_offset(seed: i64) -> (f64, f64) {
    let a = mix64(seed as u64);
    let b = mix64(a);
    let unit = |v: u64| (v >> 11) as f64 / (1u64 << 53) as f64;
    (unit(a) * OFFSET_RANGE, unit(b) * OFFSET_RANGE)
}

/// Derive a u64 seed for one cell from the world seed and its position.
///
/// Uses SipHash (via std's `DefaultHasher`) to combine the inputs into a
/// well-distributed value.
pub fn derive_cell_seed(world_seed: i64, position: WorldPos) -> u64 {
    let mut hasher = DefaultHasher::new();
    world_seed.hash(&mut hasher);
    FEATURE_SALT.hash(&mut hasher);
    position.x.hash(&mut hasher);
    position.y.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic RNG for one cell.
///
/// Yields the same sequence for the same `(world_seed, position)` pair on
/// every thread and visit.
pub fn cell_rng(world_seed: i64, position: WorldPos) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_cell_seed(world_seed, position))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
