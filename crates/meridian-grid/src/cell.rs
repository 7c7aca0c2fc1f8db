//! The smallest addressable grid unit and its change notifications.

use serde::{Deserialize, Serialize};

use crate::catalog::{FeatureId, TerrainId};
use crate::coords::WorldPos;
use crate::events::{EventSink, GridEvent};

/// Which optional cell field a change touched, with the id involved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The terrain slot.
    Terrain(TerrainId),
    /// The feature slot.
    Feature(FeatureId),
}

/// Whether the id in a [`ChangeKind`] arrived or left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    /// The id now occupies the slot.
    Added,
    /// The id no longer occupies the slot.
    Removed,
}

/// A single cell-level change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellChange {
    /// World position of the changed cell.
    pub position: WorldPos,
    /// Field and id involved.
    pub kind: ChangeKind,
    /// Arrival or departure.
    pub action: ChangeAction,
}

/// One grid cell: at most one terrain and at most one feature.
///
/// Setters publish [`GridEvent::CellChanged`] through the sink they are
/// handed. Setting a value the cell already holds is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Absolute position of this cell.
    pub position: WorldPos,
    /// Terrain id; `None` only while the owning chunk is being built.
    pub terrain: Option<TerrainId>,
    /// Feature id, if any.
    pub feature: Option<FeatureId>,
}

impl Cell {
    /// Creates an empty cell at `position`.
    pub const fn new(position: WorldPos) -> Self {
        Self {
            position,
            terrain: None,
            feature: None,
        }
    }

    /// Whether both slots are empty.
    pub fn is_empty(&self) -> bool {
        self.terrain.is_none() && self.feature.is_none()
    }

    /// Sets the terrain. Returns `true` if the value changed.
    ///
    /// Replacing an existing terrain publishes `Removed(old)` then
    /// `Added(new)`.
    pub fn set_terrain<S: EventSink + ?Sized>(&mut self, id: TerrainId, sink: &mut S) -> bool {
        match self.terrain.replace(id) {
            Some(old) if old == id => false,
            previous => {
                if let Some(old) = previous {
                    self.publish(ChangeKind::Terrain(old), ChangeAction::Removed, sink);
                }
                self.publish(ChangeKind::Terrain(id), ChangeAction::Added, sink);
                true
            }
        }
    }

    /// Clears the terrain. Returns `true` if there was one.
    pub fn clear_terrain<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        let Some(old) = self.terrain.take() else {
            return false;
        };
        self.publish(ChangeKind::Terrain(old), ChangeAction::Removed, sink);
        true
    }

    /// Sets the feature. Returns `true` if the value changed.
    pub fn set_feature<S: EventSink + ?Sized>(&mut self, id: FeatureId, sink: &mut S) -> bool {
        match self.feature.replace(id) {
            Some(old) if old == id => false,
            previous => {
                if let Some(old) = previous {
                    self.publish(ChangeKind::Feature(old), ChangeAction::Removed, sink);
                }
                self.publish(ChangeKind::Feature(id), ChangeAction::Added, sink);
                true
            }
        }
    }

    /// Clears the feature. Returns `true` if there was one.
    pub fn clear_feature<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        let Some(old) = self.feature.take() else {
            return false;
        };
        self.publish(ChangeKind::Feature(old), ChangeAction::Removed, sink);
        true
    }

    fn publish<S: EventSink + ?Sized>(&self, kind: ChangeKind, action: ChangeAction, sink: &mut S) {
        sink.publish(GridEvent::CellChanged(CellChange {
            position: self.position,
            kind,
            action,
        }));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(events: &[GridEvent]) -> Vec<(ChangeKind, ChangeAction)> {
        events
            .iter()
            .filter_map(|e| match e {
                GridEvent::CellChanged(c) => Some((c.kind, c.action)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_set_terrain_emits_added() {
        let mut cell = Cell::new(WorldPos::new(3, -2));
        let mut events = Vec::new();
        assert!(cell.set_terrain(TerrainId(2), &mut events));
        assert_eq!(cell.terrain, Some(TerrainId(2)));
        assert_eq!(
            changes(&events),
            vec![(ChangeKind::Terrain(TerrainId(2)), ChangeAction::Added)]
        );
        match &events[0] {
            GridEvent::CellChanged(c) => assert_eq!(c.position, WorldPos::new(3, -2)),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_same_value_is_noop() {
        let mut cell = Cell::new(WorldPos::default());
        let mut events = Vec::new();
        cell.set_feature(FeatureId(0), &mut events);
        events.clear();
        assert!(!cell.set_feature(FeatureId(0), &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn test_replace_emits_removed_then_added() {
        let mut cell = Cell::new(WorldPos::default());
        let mut events = Vec::new();
        cell.set_terrain(TerrainId(0), &mut events);
        events.clear();
        assert!(cell.set_terrain(TerrainId(1), &mut events));
        assert_eq!(
            changes(&events),
            vec![
                (ChangeKind::Terrain(TerrainId(0)), ChangeAction::Removed),
                (ChangeKind::Terrain(TerrainId(1)), ChangeAction::Added),
            ]
        );
    }

    #[test]
    fn test_clear_on_empty_is_noop() {
        let mut cell = Cell::new(WorldPos::default());
        let mut events = Vec::new();
        assert!(!cell.clear_terrain(&mut events));
        assert!(!cell.clear_feature(&mut events));
        assert!(events.is_empty());
        assert!(cell.is_empty());
    }

    #[test]
    fn test_clear_emits_removed() {
        let mut cell = Cell::new(WorldPos::default());
        let mut events = Vec::new();
        cell.set_feature(FeatureId(4), &mut events);
        events.clear();
        assert!(cell.clear_feature(&mut events));
        assert_eq!(cell.feature, None);
        assert_eq!(
            changes(&events),
            vec![(ChangeKind::Feature(FeatureId(4)), ChangeAction::Removed)]
        );
    }
}
