//! Fixed RTP header (RFC 3550) as sent in front of a TS bundle.
//!
//! Only the fixed 12 bytes are handled. Framing is decided by datagram length, so CSRC
//! lists and header extensions are not expected and are not skipped.

/// Size of the fixed RTP header.
pub const RTP_HEADER_SIZE: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RtpHeader {
    pub version: u8,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Parse the fixed header. Returns `None` if fewer than 12 bytes are given.
    pub fn parse(datagram: &[u8]) -> Option<Self> {
        if datagram.len() < RTP_HEADER_SIZE {
            return None;
        }
        Some(Self {
            version: datagram[0] >> 6,
            payload_type: datagram[1] & 0x7F,
            sequence: u16::from_be_bytes([datagram[2], datagram[3]]),
            timestamp: u32::from_be_bytes([datagram[4], datagram[5], datagram[6], datagram[7]]),
            ssrc: u32::from_be_bytes([datagram[8], datagram[9], datagram[10], datagram[11]]),
        })
    }
}
