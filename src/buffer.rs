//! Fixed-capacity byte ring for received units.
//!
//! - `RingBuffer`: owned byte array with `head`/`tail` cursors and lazy consumer release.
//! - `PushOutcome`: whether a pushed unit was stored or dropped on overflow.
//!
//! The ring never overwrites unread bytes. When a unit would make `head` catch up with
//! `tail`, the unit is dropped and the buffered data stays intact. One extra unit of
//! storage is allocated so the full requested capacity is usable under that rule.

use anyhow::{anyhow, Result};

/// Result of offering a unit to the ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted,
    /// The ring was full. The unit was discarded and `head` was not moved.
    Overflow,
    /// The slice was not exactly one unit long. Nothing was written.
    Rejected,
}

/// Circular byte store written one unit at a time by the receiver and read in
/// contiguous spans by the consumer.
pub struct RingBuffer {
    data: Vec<u8>,
    unit_size: usize,
    /// Next write offset.
    head: usize,
    /// Next read offset.
    tail: usize,
    /// Length of the span last handed to the consumer. Released on the next `consume`.
    pending_advance: usize,
}

impl RingBuffer {
    /// Create a ring able to hold `capacity` bytes of units.
    ///
    /// `capacity` must be a non-zero multiple of `unit_size`.
    pub fn new(unit_size: usize, capacity: usize) -> Result<Self> {
        if unit_size == 0 {
            return Err(anyhow!("unit size must be greater than zero"));
        }
        if capacity == 0 || capacity % unit_size != 0 {
            return Err(anyhow!(
                "buffer capacity {} is not a non-zero multiple of the unit size {}",
                capacity,
                unit_size
            ));
        }
        let storage = capacity
            .checked_add(unit_size)
            .ok_or_else(|| anyhow!("buffer capacity {} is too large", capacity))?;
        Ok(Self {
            data: vec![0u8; storage],
            unit_size,
            head: 0,
            tail: 0,
            pending_advance: 0,
        })
    }

    /// Usable capacity in bytes, as requested at construction.
    pub fn capacity(&self) -> usize {
        self.data.len() - self.unit_size
    }

    pub fn unit_size(&self) -> usize {
        self.unit_size
    }

    /// Bytes between `tail` and `head`, including a span not yet released by the consumer.
    pub fn buffered(&self) -> usize {
        self.distance(self.tail, self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Append one unit.
    ///
    /// Units always start on a unit boundary and the storage is a whole number of units,
    /// so a unit never straddles the physical end of the array.
    pub fn push(&mut self, unit: &[u8]) -> PushOutcome {
        if unit.len() != self.unit_size {
            return PushOutcome::Rejected;
        }
        let next_head = self.wrap(self.head + unit.len());
        if next_head == self.tail {
            return PushOutcome::Overflow;
        }
        self.data[self.head..self.head + unit.len()].copy_from_slice(unit);
        self.head = next_head;
        PushOutcome::Accepted
    }

    /// Release the previously returned span, then return the next contiguous span.
    ///
    /// The span is clipped to `max_len` rounded down to whole units, to the bytes
    /// available, and to the physical end of the array. Data that wraps around is
    /// returned by a following call. An empty slice means nothing is available.
    pub fn consume(&mut self, max_len: usize) -> &[u8] {
        if self.pending_advance > 0 {
            self.tail = self.wrap(self.tail + self.pending_advance);
            self.pending_advance = 0;
        }
        if self.head == self.tail {
            return &[];
        }

        let requested = (max_len / self.unit_size) * self.unit_size;
        if requested == 0 {
            return &[];
        }
        let contiguous = if self.head > self.tail {
            self.head - self.tail
        } else {
            self.data.len() - self.tail
        };
        let len = requested.min(contiguous);

        self.pending_advance = len;
        &self.data[self.tail..self.tail + len]
    }

    /// Discard everything buffered. `head` is left alone so a unit being pushed
    /// concurrently by the receiver stays consistent.
    pub fn flush(&mut self) {
        self.tail = self.head;
        self.pending_advance = 0;
    }

    fn wrap(&self, offset: usize) -> usize {
        if offset >= self.data.len() {
            offset - self.data.len()
        } else {
            offset
        }
    }

    fn distance(&self, from: usize, to: usize) -> usize {
        if to >= from {
            to - from
        } else {
            self.data.len() - from + to
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: usize = 4;

    fn unit(tag: u8) -> [u8; UNIT] {
        [tag; UNIT]
    }

    #[test]
    fn rejects_capacity_that_is_not_whole_units() {
        assert!(RingBuffer::new(UNIT, 0).is_err());
        assert!(RingBuffer::new(UNIT, UNIT * 3 + 1).is_err());
        assert!(RingBuffer::new(0, UNIT).is_err());
        assert_eq!(RingBuffer::new(UNIT, UNIT * 3).unwrap().capacity(), UNIT * 3);
    }

    #[test]
    fn empty_ring_returns_nothing() {
        let mut ring = RingBuffer::new(UNIT, UNIT * 2).unwrap();
        assert!(ring.is_empty());
        assert!(ring.consume(UNIT * 2).is_empty());
    }

    #[test]
    fn full_capacity_is_usable_and_next_unit_overflows() {
        let mut ring = RingBuffer::new(UNIT, UNIT * 3).unwrap();
        for tag in 1..=3 {
            assert_eq!(ring.push(&unit(tag)), PushOutcome::Accepted);
        }
        assert_eq!(ring.push(&unit(4)), PushOutcome::Overflow);
        assert_eq!(ring.buffered(), UNIT * 3);

        assert_eq!(ring.consume(usize::MAX), &[1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn max_len_is_rounded_down_to_units() {
        let mut ring = RingBuffer::new(UNIT, UNIT * 3).unwrap();
        ring.push(&unit(1));
        ring.push(&unit(2));

        assert!(ring.consume(UNIT - 1).is_empty());
        assert_eq!(ring.consume(UNIT * 2 - 1), &unit(1));
        assert_eq!(ring.consume(UNIT * 2 - 1), &unit(2));
        assert!(ring.consume(UNIT).is_empty());
    }

    #[test]
    fn span_is_released_on_next_consume_only() {
        let mut ring = RingBuffer::new(UNIT, UNIT * 2).unwrap();
        ring.push(&unit(1));
        ring.push(&unit(2));
        assert_eq!(ring.consume(UNIT * 2).len(), UNIT * 2);

        // The returned span is still owned by the consumer, so the ring is full.
        assert_eq!(ring.push(&unit(3)), PushOutcome::Overflow);

        assert!(ring.consume(UNIT).is_empty());
        assert_eq!(ring.push(&unit(3)), PushOutcome::Accepted);
        assert_eq!(ring.consume(UNIT), &unit(3));
    }

    #[test]
    fn wrapped_data_takes_two_calls() {
        let mut ring = RingBuffer::new(UNIT, UNIT * 2).unwrap();
        ring.push(&unit(1));
        ring.push(&unit(2));
        assert_eq!(ring.consume(UNIT * 2).len(), UNIT * 2);
        assert!(ring.consume(UNIT).is_empty());
        assert_eq!(ring.push(&unit(3)), PushOutcome::Accepted);
        assert_eq!(ring.push(&unit(4)), PushOutcome::Accepted);

        // tail sits on the last physical unit, so unit 4 lives at the start of the array.
        assert_eq!(ring.consume(UNIT * 4), &unit(3));
        assert_eq!(ring.consume(UNIT * 4), &unit(4));
        assert!(ring.consume(UNIT * 4).is_empty());
    }

    #[test]
    fn partial_units_are_rejected_without_moving_head() {
        let mut ring = RingBuffer::new(188, 376).unwrap();
        assert_eq!(ring.push(&[0u8; 100]), PushOutcome::Rejected);
        assert_eq!(ring.push(&[0u8; 189]), PushOutcome::Rejected);
        assert!(ring.is_empty());
        assert_eq!(ring.buffered(), 0);

        // The grid is intact, so whole units still fill the ring and then overflow.
        assert_eq!(ring.push(&[1u8; 188]), PushOutcome::Accepted);
        assert_eq!(ring.push(&[2u8; 188]), PushOutcome::Accepted);
        assert_eq!(ring.push(&[3u8; 188]), PushOutcome::Overflow);
        assert_eq!(ring.consume(usize::MAX), [[1u8; 188], [2u8; 188]].concat());
    }

    #[test]
    fn flush_drops_data_but_keeps_head() {
        let mut ring = RingBuffer::new(UNIT, UNIT * 3).unwrap();
        ring.push(&unit(1));
        ring.push(&unit(2));
        let _ = ring.consume(UNIT);
        ring.flush();

        assert!(ring.is_empty());
        assert!(ring.consume(UNIT * 3).is_empty());
        assert_eq!(ring.push(&unit(5)), PushOutcome::Accepted);
        assert_eq!(ring.consume(UNIT * 3), &unit(5));
    }
}
