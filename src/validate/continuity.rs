//! Per-PID continuity-counter tracking.

use crate::wire::{TsHeader, PID_COUNT};

/// Outcome of checking one TS packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketVerdict {
    /// Null PID. No state was read or written.
    Stuffing,
    /// Transport error indicator was set. The PID was marked unknown.
    TransportError,
    /// First packet seen for the PID since the table was last reset.
    Established,
    /// Counter advanced by one.
    InOrder,
    /// Counter repeated.
    Duplicate,
    /// Counter jumped. The table now holds the new counter.
    Discontinuity { expected: u8, received: u8 },
}

/// Last-seen continuity counter for every PID, directly indexed.
pub struct ContinuityTable {
    entries: Box<[Option<u8>]>,
}

impl ContinuityTable {
    pub fn new() -> Self {
        Self {
            entries: vec![None; PID_COUNT].into_boxed_slice(),
        }
    }

    pub fn check(&mut self, header: &TsHeader) -> PacketVerdict {
        if header.is_null() {
            return PacketVerdict::Stuffing;
        }
        let slot = &mut self.entries[usize::from(header.pid) % PID_COUNT];
        if header.transport_error {
            *slot = None;
            return PacketVerdict::TransportError;
        }

        let received = header.continuity_counter & 0x0F;
        let verdict = match *slot {
            None => PacketVerdict::Established,
            Some(prev) if received == (prev + 1) & 0x0F => PacketVerdict::InOrder,
            Some(prev) if received == prev => PacketVerdict::Duplicate,
            Some(prev) => PacketVerdict::Discontinuity {
                expected: (prev + 1) & 0x0F,
                received,
            },
        };
        *slot = Some(received);
        verdict
    }

    /// Forget every PID. The next packet on each PID is accepted unconditionally.
    pub fn reset(&mut self) {
        self.entries.fill(None);
    }

    pub fn last_counter(&self, pid: u16) -> Option<u8> {
        self.entries.get(usize::from(pid)).copied().flatten()
    }
}

impl Default for ContinuityTable {
    fn default() -> Self {
        Self::new()
    }
}
