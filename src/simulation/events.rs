//! Telemetry emitted by the motion engine
//!
//! The engine reports through the [`EventSink`] trait. [`EventBus`] fans
//! events out to registered listeners; [`EventLog`] records them.

use std::collections::HashMap;

/// Vehicle tallies by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleCounts {
    pub active: usize,
    pub blocked: usize,
    /// Vehicles retired during the most recent tick
    pub exited: usize,
    /// Live vehicles
    pub total: usize,
}

/// Kinds of event a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Counts,
    Idle,
    Jammed,
}

/// An emitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Counts(VehicleCounts),
    /// Every vehicle has left while the simulation was running
    Idle,
    /// Vehicles remain but none of them can move
    Jammed,
}

impl SimEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Counts(_) => EventKind::Counts,
            Self::Idle => EventKind::Idle,
            Self::Jammed => EventKind::Jammed,
        }
    }
}

/// Receives the engine's telemetry.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
pub trait EventSink {
    fn counts(&mut self, _counts: &VehicleCounts) {}

    fn idle(&mut self) {}

    fn jammed(&mut self) {}
}

/// A sink that discards everything
#[derive(Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {}

type Listener = Box<dyn FnMut(&SimEvent)>;

/// Synchronous publish/subscribe dispatcher.
///
/// Listeners only see events emitted after they were registered.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for one kind of event
    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&SimEvent) + 'static) {
        self.listeners.entry(kind).or_default().push(Box::new(listener));
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    pub fn emit(&mut self, event: SimEvent) {
        if let Some(listeners) = self.listeners.get_mut(&event.kind()) {
            for listener in listeners.iter_mut() {
                listener(&event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("counts", &self.listener_count(EventKind::Counts))
            .field("idle", &self.listener_count(EventKind::Idle))
            .field("jammed", &self.listener_count(EventKind::Jammed))
            .finish()
    }
}

impl EventSink for EventBus {
    fn counts(&mut self, counts: &VehicleCounts) {
        self.emit(SimEvent::Counts(*counts));
    }

    fn idle(&mut self) {
        self.emit(SimEvent::Idle);
    }

    fn jammed(&mut self) {
        self.emit(SimEvent::Jammed);
    }
}

/// Records every event in emission order
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<SimEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn last_counts(&self) -> Option<VehicleCounts> {
        self.events.iter().rev().find_map(|e| match e {
            SimEvent::Counts(counts) => Some(*counts),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for EventLog {
    fn counts(&mut self, counts: &VehicleCounts) {
        self.events.push(SimEvent::Counts(*counts));
    }

    fn idle(&mut self) {
        self.events.push(SimEvent::Idle);
    }

    fn jammed(&mut self) {
        self.events.push(SimEvent::Jammed);
    }
}
