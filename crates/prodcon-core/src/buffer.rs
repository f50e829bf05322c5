//! Fixed-capacity circular slot array
//!
//! `BoundedBuffer` is plain data: it does no locking of its own. Both slot
//! operations take `&mut self`, so the only way to reach them from several
//! threads is through a monitor that holds the exclusion lock.
//!
//! Occupancy is an explicit counter. It is never derived from the indices,
//! which wrap modulo capacity and cannot tell "full" from "empty" apart.

use crate::error::{ContractViolation, Rejected, SlotOp};

/// One storage cell of the ring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Empty,
    Filled(T),
}

impl<T> Slot<T> {
    #[inline]
    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }

    /// Take the item out, leaving the slot empty
    #[inline]
    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Slot::Empty) {
            Slot::Filled(item) => Some(item),
            Slot::Empty => None,
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

/// Bounded circular buffer
///
/// ```ignore
/// let mut buf = BoundedBuffer::new(2);
/// assert_eq!(buf.write('A').unwrap(), 0);
/// assert_eq!(buf.read().unwrap(), (0, 'A'));
/// ```
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    slots: Box<[Slot<T>]>,
    /// Oldest unconsumed item
    read_index: usize,
    /// Next slot to fill
    write_index: usize,
    occupied: usize,
}

impl<T> BoundedBuffer<T> {
    /// Create an empty buffer holding up to `capacity` items
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Configuration is validated before a
    /// buffer is built, so reaching this is a caller bug.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be > 0");
        let slots: Vec<Slot<T>> = (0..capacity).map(|_| Slot::Empty).collect();
        Self {
            slots: slots.into_boxed_slice(),
            read_index: 0,
            write_index: 0,
            occupied: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.occupied == self.slots.len()
    }

    #[inline]
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    #[inline]
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Store `item` at the write index and return the slot it landed in
    ///
    /// Fails without touching any slot when the buffer is full or the target
    /// slot still holds an unconsumed item.
    pub fn write(&mut self, item: T) -> Result<usize, Rejected<T>> {
        let slot = self.write_index;
        if self.is_full() || self.slots[slot].is_filled() {
            return Err(Rejected {
                item,
                violation: self.violation(SlotOp::Write, slot),
            });
        }

        self.slots[slot] = Slot::Filled(item);
        self.write_index = (slot + 1) % self.slots.len();
        self.occupied += 1;
        Ok(slot)
    }

    /// Take the oldest item, returning it with the slot it came from
    pub fn read(&mut self) -> Result<(usize, T), ContractViolation> {
        let slot = self.read_index;
        if self.is_empty() {
            return Err(self.violation(SlotOp::Read, slot));
        }
        let item = match self.slots[slot].take() {
            Some(item) => item,
            None => return Err(self.violation(SlotOp::Read, slot)),
        };

        self.read_index = (slot + 1) % self.slots.len();
        self.occupied -= 1;
        Ok((slot, item))
    }

    fn violation(&self, op: SlotOp, slot: usize) -> ContractViolation {
        ContractViolation {
            op,
            slot,
            occupied: self.occupied,
            capacity: self.slots.len(),
        }
    }

    /// Check the index/occupancy relation; only meaningful between operations
    pub fn is_consistent(&self) -> bool {
        let cap = self.slots.len();
        let filled = self.slots.iter().filter(|s| s.is_filled()).count();
        let distance = (self.write_index + cap - self.read_index) % cap;
        let expected = if distance == 0 && self.occupied == cap { cap } else { distance };
        self.occupied <= cap && filled == self.occupied && expected == self.occupied
    }
}
