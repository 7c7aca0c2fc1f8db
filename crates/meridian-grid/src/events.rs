//! Grid event delivery.
//!
//! Chunks publish [`GridEvent`]s into an [`EventSink`]. The streamer's sink
//! is an [`ObserverList`] that fans every event out to the subscribed
//! [`GridObserver`]s synchronously and in publication order. Consumers on
//! other threads subscribe a [`ChannelObserver`] and drain its receiver.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::cell::{Cell, CellChange};

/// Notification emitted by the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridEvent {
    /// A cell became resident with the given state.
    CellLoaded(Cell),
    /// A cell left residency; carries the state it was persisted with.
    CellUnloaded(Cell),
    /// A terrain or feature was added to or removed from a resident cell.
    CellChanged(CellChange),
}

/// Destination for published events.
pub trait EventSink {
    /// Delivers one event.
    fn publish(&mut self, event: GridEvent);
}

impl EventSink for Vec<GridEvent> {
    fn publish(&mut self, event: GridEvent) {
        self.push(event);
    }
}

/// Receives grid events.
///
/// Any `FnMut(&GridEvent) + Send` closure is an observer.
pub trait GridObserver: Send {
    /// Called once per event, in publication order.
    fn on_event(&mut self, event: &GridEvent);
}

impl<F> GridObserver for F
where
    F: FnMut(&GridEvent) + Send,
{
    fn on_event(&mut self, event: &GridEvent) {
        self(event)
    }
}

/// Handle returned by [`ObserverList::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Ordered list of subscribed observers.
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<(ObserverId, Box<dyn GridObserver>)>,
    next_id: u64,
    published: u64,
}

impl ObserverList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer; it receives every event published from now on.
    pub fn subscribe(&mut self, observer: impl GridObserver + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Removes an observer. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Number of subscribed observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Total events published through this list.
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl EventSink for ObserverList {
    fn publish(&mut self, event: GridEvent) {
        self.published += 1;
        for (_, observer) in &mut self.observers {
            observer.on_event(&event);
        }
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.observers.len())
            .field("published", &self.published)
            .finish()
    }
}

/// Observer that forwards events into a channel.
///
/// Events published after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<GridEvent>,
}

impl ChannelObserver {
    /// Wraps an existing sender.
    pub fn new(sender: Sender<GridEvent>) -> Self {
        Self { sender }
    }

    /// Creates an observer together with the receiving end of an
    /// unbounded channel.
    pub fn unbounded() -> (Self, Receiver<GridEvent>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }
}

impl GridObserver for ChannelObserver {
    fn on_event(&mut self, event: &GridEvent) {
        let _ = self.sender.send(*event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
