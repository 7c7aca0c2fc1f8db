//! World, chunk, and chunk-local cell coordinates.
//!
//! A world position splits uniquely into the chunk that owns it and the
//! cell offset inside that chunk:
//!
//! ```text
//! world = chunk * chunk_size + local,   0 <= local < chunk_size
//! ```
//!
//! Flooring division (`div_euclid` / `rem_euclid`) keeps the split correct
//! for negative positions, so `-1` lands in chunk `-1` at local
//! `chunk_size - 1`.
//!
//! Near the ends of the `i64` range a chunk may own cells that cannot be
//! represented. Such chunks fall outside [`ChunkCoord::representable_range`]
//! and are never streamed.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Absolute cell position in the infinite world grid.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WorldPos {
    /// World X, in cells.
    pub x: i64,
    /// World Y, in cells.
    pub y: i64,
}

impl WorldPos {
    /// Creates a new world position.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Floors a continuous position (e.g. a camera centre) onto the cell grid.
    ///
    /// Non-finite components map to `0`.
    pub fn from_point(x: f64, y: f64) -> Self {
        let floor = |v: f64| if v.is_finite() { v.floor() as i64 } else { 0 };
        Self::new(floor(x), floor(y))
    }

    /// Splits this position into its owning chunk and local offset.
    pub fn split(self, chunk_size: u32) -> (ChunkCoord, LocalCoord) {
        (
            ChunkCoord::containing(self, chunk_size),
            LocalCoord::within(self, chunk_size),
        )
    }
}

/// Identifies a chunk in the chunk grid.
///
/// Ordering is by `x` then `y`, which is also the order chunks inside a
/// streaming window are constructed in.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkCoord {
    /// Chunk-grid X coordinate.
    pub x: i64,
    /// Chunk-grid Y coordinate.
    pub y: i64,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The chunk owning `pos`: `floor(pos / chunk_size)` per axis.
    pub fn containing(pos: WorldPos, chunk_size: u32) -> Self {
        let size = i64::from(chunk_size);
        Self::new(pos.x.div_euclid(size), pos.y.div_euclid(size))
    }

    /// Chunk indices, on either axis, whose cells all fit in `i64`.
    pub fn representable_range(chunk_size: u32) -> RangeInclusive<i64> {
        let size = i64::from(chunk_size.max(1));
        let low = i64::MIN.div_euclid(size) + i64::from(i64::MIN.rem_euclid(size) != 0);
        let high = (i64::MAX - (size - 1)).div_euclid(size);
        low..=high
    }

    /// Whether every cell of this chunk has a representable world position.
    pub fn is_representable(self, chunk_size: u32) -> bool {
        let range = Self::representable_range(chunk_size);
        range.contains(&self.x) && range.contains(&self.y)
    }

    /// World position of this chunk's `(0, 0)` cell, or `None` if the chunk
    /// is not representable.
    pub fn checked_origin(self, chunk_size: u32) -> Option<WorldPos> {
        if !self.is_representable(chunk_size) {
            return None;
        }
        let size = i64::from(chunk_size);
        Some(WorldPos::new(self.x.checked_mul(size)?, self.y.checked_mul(size)?))
    }

    /// World position of this chunk's `(0, 0)` cell.
    ///
    /// Only meaningful for representable chunks; the result wraps otherwise.
    pub fn origin(self, chunk_size: u32) -> WorldPos {
        let size = i64::from(chunk_size);
        WorldPos::new(self.x.wrapping_mul(size), self.y.wrapping_mul(size))
    }

    /// World position of the cell at `local` inside this chunk.
    ///
    /// Exact for representable chunks and in-bounds `local`.
    pub fn world_of(self, local: LocalCoord, chunk_size: u32) -> WorldPos {
        let origin = self.origin(chunk_size);
        WorldPos::new(
            origin.x.wrapping_add(i64::from(local.x)),
            origin.y.wrapping_add(i64::from(local.y)),
        )
    }

    /// Chebyshev (chessboard) distance, in chunks.
    pub fn chebyshev_distance(self, other: ChunkCoord) -> u64 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cell offset inside its chunk, each component in `[0, chunk_size)`.
///
/// Ordering is by `x` then `y`; cells are always visited in this order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LocalCoord {
    /// Local X, in cells.
    pub x: u32,
    /// Local Y, in cells.
    pub y: u32,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Offset of `pos` inside its owning chunk: `pos mod chunk_size` per axis.
    pub fn within(pos: WorldPos, chunk_size: u32) -> Self {
        let size = i64::from(chunk_size);
        // rem_euclid is in [0, size), which always fits in u32.
        Self::new(
            pos.x.rem_euclid(size) as u32,
            pos.y.rem_euclid(size) as u32,
        )
    }

    /// Whether both components are inside `[0, chunk_size)`.
    pub fn in_bounds(self, chunk_size: u32) -> bool {
        self.x < chunk_size && self.y < chunk_size
    }

    /// Dense storage index (`x` major) for a chunk of `chunk_size`.
    pub fn index(self, chunk_size: u32) -> usize {
        self.x as usize * chunk_size as usize + self.y as usize
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize, chunk_size: u32) -> Self {
        let size = chunk_size as usize;
        Self::new((index / size) as u32, (index % size) as u32)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
