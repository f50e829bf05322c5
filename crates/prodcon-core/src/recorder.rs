//! Activity recording
//!
//! Monitors report one event per successful produce/consume and one per
//! detected contract violation. Recording always happens after the
//! exclusion lock is released, so a slow sink never lengthens the critical
//! section.

use core::fmt;
use crossbeam_queue::SegQueue;

use crate::id::WorkerId;

/// Kind of buffer activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Produced,
    Consumed,
    Anomaly,
}

/// One recorded buffer operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Slot written, read, or found in violation
    pub slot: usize,
    /// Pool worker that performed it, if called from a pool
    pub worker: Option<WorkerId>,
}

impl Event {
    pub fn new(kind: EventKind, slot: usize, worker: Option<WorkerId>) -> Self {
        Self { kind, slot, worker }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(worker) = self.worker {
            write!(f, "[{}] ", worker)?;
        }
        match self.kind {
            EventKind::Produced => write!(f, "Produced in slot: {}", self.slot),
            EventKind::Consumed => write!(f, "Consumed from slot: {}", self.slot),
            EventKind::Anomaly => write!(f, "Anomaly at slot: {}", self.slot),
        }
    }
}

/// Sink for buffer activity
pub trait ActivityRecorder: Send + Sync {
    /// Record one event; must not block for long
    fn record(&self, event: Event);

    /// Push buffered events to their destination
    fn flush(&self) {}
}

/// Discards everything. Used when no sink is configured or it failed to open.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl ActivityRecorder for NullRecorder {
    #[inline]
    fn record(&self, _event: Event) {}
}

/// Collects events in a lock-free queue
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: SegQueue<Event>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self { events: SegQueue::new() }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<Event> {
        let mut out = Vec::with_capacity(self.events.len());
        while let Some(event) = self.events.pop() {
            out.push(event);
        }
        out
    }
}

impl ActivityRecorder for MemoryRecorder {
    fn record(&self, event: Event) {
        self.events.push(event);
    }
}

/// Routes events to the leveled log: anomalies at error, the rest at debug
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecorder;

impl ActivityRecorder for LogRecorder {
    fn record(&self, event: Event) {
        match event.kind {
            EventKind::Anomaly => crate::pc_error!("{}", event),
            _ => crate::pc_debug!("{}", event),
        }
    }
}

/// Event totals, handy for checking a drained `MemoryRecorder`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventCounts {
    pub produced: usize,
    pub consumed: usize,
    pub anomalies: usize,
}

impl EventCounts {
    pub fn tally(events: &[Event]) -> Self {
        events.iter().fold(Self::default(), |mut acc, e| {
            match e.kind {
                EventKind::Produced => acc.produced += 1,
                EventKind::Consumed => acc.consumed += 1,
                EventKind::Anomaly => acc.anomalies += 1,
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_line_format() {
        let e = Event::new(EventKind::Produced, 4, Some(WorkerId::producer(2)));
        assert_eq!(e.to_string(), "[producer-2] Produced in slot: 4");

        let e = Event::new(EventKind::Consumed, 0, None);
        assert_eq!(e.to_string(), "Consumed from slot: 0");

        let e = Event::new(EventKind::Anomaly, 7, None);
        assert_eq!(e.to_string(), "Anomaly at slot: 7");
    }

    #[test]
    fn test_memory_recorder_drain() {
        let rec = MemoryRecorder::new();
        rec.record(Event::new(EventKind::Produced, 0, None));
        rec.record(Event::new(EventKind::Consumed, 0, None));
        assert_eq!(rec.len(), 2);

        let events = rec.drain();
        assert!(rec.is_empty());
        assert_eq!(
            EventCounts::tally(&events),
            EventCounts { produced: 1, consumed: 1, anomalies: 0 }
        );
    }

    #[test]
    fn test_null_recorder_accepts_anything() {
        let rec = NullRecorder;
        rec.record(Event::new(EventKind::Anomaly, 1, None));
        rec.flush();
    }
}
