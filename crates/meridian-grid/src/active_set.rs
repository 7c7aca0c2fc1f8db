//! Resident chunks keyed by [`ChunkCoord`], and the square window that
//! decides residency.
//!
//! The [`ActiveSet`] provides O(1) lookup, insert and removal using an
//! [`FxHashMap`](rustc_hash::FxHashMap). Anything order-sensitive goes
//! through [`ActiveSet::sorted_coords`].

use std::ops::RangeInclusive;

use rustc_hash::FxHashMap;

use crate::chunk::Chunk;
use crate::coords::ChunkCoord;

/// Square of chunks within Chebyshev distance `radius` of `center`.
///
/// Chunks that are not representable for `chunk_size` (see
/// [`ChunkCoord::representable_range`]) are excluded, so a window at the
/// edge of the world is clipped rather than wrapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// Chunk containing the viewpoint.
    pub center: ChunkCoord,
    /// Chebyshev radius in chunks.
    pub radius: u32,
    /// Cells per chunk side.
    pub chunk_size: u32,
}

impl Window {
    /// Creates a window.
    pub fn new(center: ChunkCoord, radius: u32, chunk_size: u32) -> Self {
        Self {
            center,
            radius,
            chunk_size,
        }
    }

    /// Whether `coord` lies inside the window.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.center.chebyshev_distance(coord) <= u64::from(self.radius)
            && coord.is_representable(self.chunk_size)
    }

    /// Number of chunks in the window; `(2r + 1)²` away from the edges.
    pub fn len(&self) -> usize {
        span_len(&self.x_span()) * span_len(&self.y_span())
    }

    /// Whether the window holds no chunk at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Window coordinates, `x` outer then `y` inner (ascending order).
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        let ys = self.y_span();
        self.x_span()
            .flat_map(move |x| ys.clone().map(move |y| ChunkCoord::new(x, y)))
    }

    fn x_span(&self) -> RangeInclusive<i64> {
        self.span(self.center.x)
    }

    fn y_span(&self) -> RangeInclusive<i64> {
        self.span(self.center.y)
    }

    fn span(&self, center: i64) -> RangeInclusive<i64> {
        let r = i64::from(self.radius);
        let limits = ChunkCoord::representable_range(self.chunk_size);
        let low = center.saturating_sub(r).max(*limits.start());
        let high = center.saturating_add(r).min(*limits.end());
        low..=high
    }
}

fn span_len(span: &RangeInclusive<i64>) -> usize {
    if span.is_empty() {
        0
    } else {
        span.start().abs_diff(*span.end()) as usize + 1
    }
}

/// Owns every resident chunk.
///
/// A coordinate appears at most once and every member is loaded.
#[derive(Debug, Default)]
pub struct ActiveSet {
    chunks: FxHashMap<ChunkCoord, Chunk>,
}

impl ActiveSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a loaded chunk.
    ///
    /// If the coordinate is already resident the existing chunk is kept and
    /// the new one handed back.
    #[allow(clippy::result_large_err)]
    pub fn insert(&mut self, chunk: Chunk) -> Result<(), Chunk> {
        let coord = chunk.coord();
        if self.chunks.contains_key(&coord) {
            return Err(chunk);
        }
        self.chunks.insert(coord, chunk);
        Ok(())
    }

    /// Removes and returns the chunk at `coord`.
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        self.chunks.remove(&coord)
    }

    /// Immutable access to a resident chunk.
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Mutable access to a resident chunk.
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    /// Whether `coord` is resident.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Resident coordinates in ascending order.
    pub fn sorted_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Resident coordinates outside `window`, ascending.
    pub fn outside(&self, window: &Window) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|coord| !window.contains(**coord))
            .copied()
            .collect();
        coords.sort_unstable();
        coords
    }

    /// Iterates over resident chunks in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
