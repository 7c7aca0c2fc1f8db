//! Running counts of grid events.

use meridian_grid::{ChangeAction, GridEvent};

/// Event counters folded from an observer's stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventTally {
    /// `CellLoaded` events seen.
    pub cells_loaded: u64,
    /// `CellUnloaded` events seen.
    pub cells_unloaded: u64,
    /// Terrain or feature additions.
    pub added: u64,
    /// Terrain or feature removals.
    pub removed: u64,
}

impl EventTally {
    /// Counts one event.
    pub fn record(&mut self, event: &GridEvent) {
        match event {
            GridEvent::CellLoaded(_) => self.cells_loaded += 1,
            GridEvent::CellUnloaded(_) => self.cells_unloaded += 1,
            GridEvent::CellChanged(change) => match change.action {
                ChangeAction::Added => self.added += 1,
                ChangeAction::Removed => self.removed += 1,
            },
        }
    }

    /// Counts every event in `events`.
    pub fn extend(&mut self, events: impl IntoIterator<Item = GridEvent>) {
        for event in events {
            self.record(&event);
        }
    }

    /// Cells currently resident according to the load/unload balance.
    pub fn resident_cells(&self) -> u64 {
        self.cells_loaded.saturating_sub(self.cells_unloaded)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use meridian_grid::{Cell, CellChange, ChangeKind, TerrainId, WorldPos};

    use super::*;

    #[test]
    fn test_counts_each_kind() {
        let cell = Cell::new(WorldPos::new(1, 2));
        let change = |action| {
            GridEvent::CellChanged(CellChange {
                position: cell.position,
                kind: ChangeKind::Terrain(TerrainId(0)),
                action,
            })
        };
        let events = [
            GridEvent::CellLoaded(cell),
            change(ChangeAction::Added),
            change(ChangeAction::Removed),
            change(ChangeAction::Added),
            GridEvent::CellLoaded(cell),
            GridEvent::CellUnloaded(cell),
        ];

        let mut tally = EventTally::default();
        tally.extend(events);
        assert_eq!(
            tally,
            EventTally {
                cells_loaded: 2,
                cells_unloaded: 1,
                added: 2,
                removed: 1,
            }
        );
        assert_eq!(tally.resident_cells(), 1);
    }
}
