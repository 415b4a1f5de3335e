//! Wire formats consumed by the ingest socket.
//!
//! - `ts`: the 4-byte MPEG transport-stream packet header
//! - `rtp`: the fixed 12-byte RTP header that may prefix a bundle
//! - `framing`: unit layout constants and length-based datagram classification
//!
//! Nothing here looks past the headers. TS payloads are carried as opaque bytes.

pub mod framing;
pub mod rtp;
pub mod ts;

pub use framing::{Framing, UnitLayout, DEFAULT_PACKETS_PER_UNIT, MAX_PACKETS_PER_UNIT};
pub use rtp::{RtpHeader, RTP_HEADER_SIZE};
pub use ts::{TsHeader, NULL_PID, PID_COUNT, TS_PACKET_SIZE, TS_SYNC_BYTE};
