//! ASCII rendering of resident cells around a viewpoint.

use meridian_grid::{Catalog, Cell, ChunkStreamer, TerrainCategory, WorldPos};

/// Glyph for one cell; `' '` for cells that are not resident.
pub fn glyph(cell: Option<&Cell>, catalog: &Catalog) -> char {
    let Some(cell) = cell else {
        return ' ';
    };
    if cell.feature.is_some() {
        return '#';
    }
    match cell
        .terrain
        .and_then(|id| catalog.terrain(id))
        .map(|def| def.category)
    {
        Some(TerrainCategory::Ocean) => '~',
        Some(TerrainCategory::Water) => '-',
        Some(TerrainCategory::Land) => '.',
        None => '?',
    }
}

/// Renders the `(2 * half + 1)` square centered on `center`, one row per y.
pub fn ascii_map(streamer: &ChunkStreamer, center: WorldPos, half: i64) -> String {
    let catalog = streamer.catalog();
    let side = (2 * half + 1).max(0) as usize;
    let mut out = String::with_capacity(side * (side + 1));
    for y in center.y - half..=center.y + half {
        for x in center.x - half..=center.x + half {
            out.push(glyph(streamer.get_cell(WorldPos::new(x, y)), catalog));
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use meridian_grid::{FeatureKind, GeneratedCell, MemoryStore, StreamerConfig};

    use super::*;

    fn striped(p: WorldPos) -> GeneratedCell {
        let terrain = match p.x.rem_euclid(3) {
            0 => TerrainCategory::Ocean,
            1 => TerrainCategory::Water,
            _ => TerrainCategory::Land,
        };
        let feature = (terrain == TerrainCategory::Land && p.y == 0).then_some(FeatureKind::Station);
        GeneratedCell { terrain, feature }
    }

    #[test]
    fn test_map_shows_terrain_and_features() {
        let mut streamer = ChunkStreamer::new(
            StreamerConfig {
                chunk_size: 4,
                load_radius: 0,
            },
            Arc::new(MemoryStore::new()),
            Arc::new(striped),
            Arc::new(Catalog::standard()),
        )
        .unwrap();
        streamer.tick(WorldPos::new(1, 1));

        let map = ascii_map(&streamer, WorldPos::new(1, 1), 1);
        assert_eq!(map, "~-#\n~-.\n~-.\n");
    }

    #[test]
    fn test_unloaded_cells_are_blank() {
        let streamer = ChunkStreamer::new(
            StreamerConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(striped),
            Arc::new(Catalog::standard()),
        )
        .unwrap();
        assert_eq!(ascii_map(&streamer, WorldPos::new(0, 0), 0), " \n");
    }
}
