//! Stream ingestion.
//!
//! - `IngestCore`: the ring, continuity table, sequence tracker and counters, owned
//!   together and driven one datagram at a time. It has no socket and no thread.
//! - `udp`: `VideoIngest`, which binds a UDP socket, runs the receiver thread and hands
//!   the core to consumers behind a single mutex.
//!
//! The ingestion layer is responsible for:
//! - Classifying datagrams by length (bare bundle, RTP-framed bundle, or foreign)
//! - Counting RTP sequence gaps and TS continuity/transport errors
//! - Buffering raw units in arrival order, dropping the newest unit on overflow
//!
//! The ingestion layer MUST NOT:
//! - Reorder, repair or decode units
//! - Withhold bytes because a counter moved
//! - Touch counters for datagrams it does not recognise

pub mod udp;

use anyhow::Result;

use crate::buffer::{PushOutcome, RingBuffer};
use crate::stats::IngestStats;
use crate::validate::{ContinuityTable, PacketVerdict, SequenceTracker, SequenceVerdict};
use crate::wire::{ts, Framing, RtpHeader, TsHeader, UnitLayout};

pub use udp::{IngestOptions, ReceiverState, VideoIngest};

/// What happened to one datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatagramOutcome {
    /// Length matched neither framing. Nothing was counted.
    Ignored,
    Buffered,
    /// Validated and counted, but the ring was full so the unit was dropped.
    Overflow,
}

/// Jointly-owned ingest state.
pub struct IngestCore {
    layout: UnitLayout,
    ring: RingBuffer,
    continuity: ContinuityTable,
    sequence: SequenceTracker,
    stats: IngestStats,
    /// Set while consecutive units are being dropped, to log once per overflow episode.
    overflowing: bool,
}

impl IngestCore {
    /// `buffer_capacity` must be a non-zero multiple of `layout.unit_size()`.
    pub fn new(layout: UnitLayout, buffer_capacity: usize) -> Result<Self> {
        Ok(Self {
            layout,
            ring: RingBuffer::new(layout.unit_size(), buffer_capacity)?,
            continuity: ContinuityTable::new(),
            sequence: SequenceTracker::new(),
            stats: IngestStats::default(),
            overflowing: false,
        })
    }

    pub fn layout(&self) -> UnitLayout {
        self.layout
    }

    pub fn buffer_capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Bytes currently held by the ring, including a span not yet released by `recv`.
    pub fn buffered(&self) -> usize {
        self.ring.buffered()
    }

    pub fn accept_datagram(&mut self, datagram: &[u8]) -> DatagramOutcome {
        let unit = match self.layout.classify(datagram) {
            Framing::Rtp { header, unit } => {
                self.observe_sequence(&header);
                unit
            }
            Framing::Bare { unit } => unit,
            Framing::Unrecognised { len } => {
                log::trace!("ignoring {} byte datagram", len);
                return DatagramOutcome::Ignored;
            }
        };

        for packet in ts::packets(unit) {
            if let Some(header) = TsHeader::parse(packet) {
                if !header.has_sync() {
                    log::trace!(
                        "ts packet on pid {:#06x} has sync byte {:#04x}",
                        header.pid,
                        header.sync_byte
                    );
                }
                self.check_packet(&header);
            }
        }
        self.stats.packet_count += 1;

        match self.ring.push(unit) {
            PushOutcome::Accepted => {
                self.overflowing = false;
                DatagramOutcome::Buffered
            }
            PushOutcome::Overflow => {
                self.stats.overflow_error_count += 1;
                if !self.overflowing {
                    log::debug!(
                        "ingest buffer full ({} bytes); dropping incoming units",
                        self.ring.capacity()
                    );
                    self.overflowing = true;
                }
                DatagramOutcome::Overflow
            }
            PushOutcome::Rejected => {
                log::warn!(
                    "dropping {} byte unit that does not match the {} byte layout",
                    unit.len(),
                    self.ring.unit_size()
                );
                DatagramOutcome::Ignored
            }
        }
    }

    /// Next contiguous span of buffered bytes, at most `max_size` rounded down to whole
    /// units. The span is released by the following call or by `flush`.
    pub fn recv(&mut self, max_size: usize) -> &[u8] {
        self.ring.consume(max_size)
    }

    /// Drop buffered data, forget all continuity and sequence state, zero the counters.
    pub fn flush(&mut self) {
        self.ring.flush();
        self.continuity.reset();
        self.sequence.reset();
        self.stats = IngestStats::default();
        self.overflowing = false;
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    fn observe_sequence(&mut self, header: &RtpHeader) {
        match self.sequence.observe(header.sequence) {
            SequenceVerdict::Established => log::trace!(
                "rtp stream: ssrc {:#010x} version {} payload type {} sequence {} timestamp {}",
                header.ssrc,
                header.version,
                header.payload_type,
                header.sequence,
                header.timestamp
            ),
            SequenceVerdict::InOrder => {}
            SequenceVerdict::Gap { expected, received } => {
                log::debug!(
                    "rtp sequence gap: expected {} received {}; resetting continuity state",
                    expected,
                    received
                );
                self.stats.network_error_count += 1;
                self.continuity.reset();
            }
        }
    }

    fn check_packet(&mut self, header: &TsHeader) {
        match self.continuity.check(header) {
            PacketVerdict::TransportError => self.stats.transport_error_count += 1,
            PacketVerdict::Discontinuity { .. } => self.stats.continuity_error_count += 1,
            PacketVerdict::Stuffing
            | PacketVerdict::Established
            | PacketVerdict::InOrder
            | PacketVerdict::Duplicate => {}
        }
    }
}
