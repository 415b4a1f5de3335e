//! RTP sequence-number gap detection.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceVerdict {
    Established,
    InOrder,
    /// Anything other than `last + 1`, including repeats and reordering.
    Gap { expected: u16, received: u16 },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SequenceTracker {
    last: Option<u16>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, sequence: u16) -> SequenceVerdict {
        let verdict = match self.last {
            None => SequenceVerdict::Established,
            Some(last) if sequence == last.wrapping_add(1) => SequenceVerdict::InOrder,
            Some(last) => SequenceVerdict::Gap {
                expected: last.wrapping_add(1),
                received: sequence,
            },
        };
        self.last = Some(sequence);
        verdict
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<u16> {
        self.last
    }
}
