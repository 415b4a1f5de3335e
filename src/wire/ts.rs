//! MPEG transport-stream packet header.

/// Size of one transport-stream packet.
pub const TS_PACKET_SIZE: usize = 188;

/// Expected first byte of every transport-stream packet.
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Number of distinct PIDs (13-bit field).
pub const PID_COUNT: usize = 1 << 13;

/// Reserved PID carrying stuffing packets.
pub const NULL_PID: u16 = 0x1FFF;

/// The fields of a TS header that stream-integrity checks care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TsHeader {
    pub sync_byte: u8,
    pub transport_error: bool,
    pub pid: u16,
    pub continuity_counter: u8,
}

impl TsHeader {
    /// Parse the first four bytes of a packet. Returns `None` if `packet` is shorter
    /// than a header.
    pub fn parse(packet: &[u8]) -> Option<Self> {
        if packet.len() < 4 {
            return None;
        }
        Some(Self {
            sync_byte: packet[0],
            transport_error: packet[1] & 0x80 != 0,
            pid: (u16::from(packet[1] & 0x1F) << 8) | u16::from(packet[2]),
            continuity_counter: packet[3] & 0x0F,
        })
    }

    pub fn is_null(&self) -> bool {
        self.pid == NULL_PID
    }

    pub fn has_sync(&self) -> bool {
        self.sync_byte == TS_SYNC_BYTE
    }
}

/// Iterate over the whole TS packets contained in `unit`. A trailing partial packet is
/// not yielded.
pub fn packets(unit: &[u8]) -> impl Iterator<Item = &[u8]> {
    unit.chunks_exact(TS_PACKET_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pid_counter_and_flags() {
        let mut packet = [0u8; TS_PACKET_SIZE];
        packet[0] = TS_SYNC_BYTE;
        packet[1] = 0x80 | 0x40 | 0x01;
        packet[2] = 0x23;
        packet[3] = 0x1A;

        let header = TsHeader::parse(&packet).unwrap();
        assert!(header.has_sync());
        assert!(header.transport_error);
        assert_eq!(header.pid, 0x0123);
        assert_eq!(header.continuity_counter, 0x0A);
    }

    #[test]
    fn recognises_null_pid() {
        let packet = [TS_SYNC_BYTE, 0x1F, 0xFF, 0x10];
        let header = TsHeader::parse(&packet).unwrap();
        assert!(header.is_null());
        assert!(!header.transport_error);
    }

    #[test]
    fn short_input_has_no_header() {
        assert!(TsHeader::parse(&[TS_SYNC_BYTE, 0x00, 0x00]).is_none());
    }

    #[test]
    fn packets_skips_trailing_fragment() {
        let unit = vec![0u8; TS_PACKET_SIZE * 2 + 10];
        assert_eq!(packets(&unit).count(), 2);
    }
}
