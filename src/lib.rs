//! ts-ingest
//!
//! Real-time ingest of MPEG transport streams sent over UDP, bare or RTP-framed.
//!
//! # Architecture
//!
//! A dedicated receiver thread pulls datagrams off a socket and feeds them to an
//! `IngestCore`, which owns four things behind one mutex:
//!
//! 1. **Ring buffer**: fixed-capacity byte store. Overflow drops the newest unit and never
//!    touches unread data.
//! 2. **Continuity table**: last continuity counter for each of the 8192 PIDs.
//! 3. **Sequence tracker**: last RTP sequence number. A gap invalidates the table.
//! 4. **Counters**: packets, transport errors, network errors, continuity errors, overflows.
//!
//! Consumers pull raw bytes with `VideoIngest::recv`, which never waits for data.
//! Integrity counters are observational only and never gate delivery.
//!
//! # Module Structure
//!
//! - `wire`: TS header, RTP header, unit layout and framing classification
//! - `buffer`: the ring buffer
//! - `validate`: continuity table and sequence tracker
//! - `stats`: counter snapshot
//! - `ingest`: `IngestCore` and the UDP receiver (`VideoIngest`)
//! - `config`: daemon configuration from file and environment

pub mod buffer;
pub mod config;
pub mod ingest;
pub mod stats;
pub mod validate;
pub mod wire;

pub use buffer::{PushOutcome, RingBuffer};
pub use config::IngestConfig;
pub use ingest::{DatagramOutcome, IngestCore, IngestOptions, ReceiverState, VideoIngest};
pub use stats::IngestStats;
pub use validate::{ContinuityTable, PacketVerdict, SequenceTracker, SequenceVerdict};
pub use wire::{Framing, RtpHeader, TsHeader, UnitLayout};
