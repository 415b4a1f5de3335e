//! Unit layout and length-based framing detection.
//!
//! A unit is a bundle of whole TS packets sent as one datagram, optionally behind a
//! fixed RTP header. The framing of an incoming datagram is decided purely from its
//! length: `unit_size` means a bare bundle, `unit_size + RTP_HEADER_SIZE` means an
//! RTP-framed bundle, and anything else is not ours.

use anyhow::{anyhow, Result};

use super::rtp::{RtpHeader, RTP_HEADER_SIZE};
use super::ts::TS_PACKET_SIZE;

/// Seven packets (1316 bytes) is the largest bundle that fits a 1500-byte MTU with
/// IP, UDP and RTP headers.
pub const DEFAULT_PACKETS_PER_UNIT: usize = 7;
pub const MAX_PACKETS_PER_UNIT: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitLayout {
    packets_per_unit: usize,
}

/// Classification of a received datagram.
#[derive(Debug, PartialEq, Eq)]
pub enum Framing<'a> {
    /// RTP header followed by exactly one unit.
    Rtp { header: RtpHeader, unit: &'a [u8] },
    /// Exactly one unit with no header.
    Bare { unit: &'a [u8] },
    /// Any other length. Ignored without touching counters.
    Unrecognised { len: usize },
}

impl UnitLayout {
    pub fn new(packets_per_unit: usize) -> Result<Self> {
        if packets_per_unit == 0 || packets_per_unit > MAX_PACKETS_PER_UNIT {
            return Err(anyhow!(
                "packets per unit must be between 1 and {}, got {}",
                MAX_PACKETS_PER_UNIT,
                packets_per_unit
            ));
        }
        Ok(Self { packets_per_unit })
    }

    pub fn packets_per_unit(&self) -> usize {
        self.packets_per_unit
    }

    /// Length of a bare unit datagram.
    pub fn unit_size(&self) -> usize {
        self.packets_per_unit * TS_PACKET_SIZE
    }

    /// Length of an RTP-framed unit datagram.
    pub fn rtp_unit_size(&self) -> usize {
        self.unit_size() + RTP_HEADER_SIZE
    }

    /// Round `bytes` down to a whole number of units.
    pub fn whole_units(&self, bytes: usize) -> usize {
        (bytes / self.unit_size()) * self.unit_size()
    }

    pub fn classify<'a>(&self, datagram: &'a [u8]) -> Framing<'a> {
        let len = datagram.len();
        if len == self.rtp_unit_size() {
            if let Some(header) = RtpHeader::parse(datagram) {
                return Framing::Rtp {
                    header,
                    unit: &datagram[RTP_HEADER_SIZE..],
                };
            }
        }
        if len == self.unit_size() {
            return Framing::Bare { unit: datagram };
        }
        Framing::Unrecognised { len }
    }
}

impl Default for UnitLayout {
    fn default() -> Self {
        Self {
            packets_per_unit: DEFAULT_PACKETS_PER_UNIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_mtu_bundle() {
        let layout = UnitLayout::default();
        assert_eq!(layout.unit_size(), 1316);
        assert_eq!(layout.rtp_unit_size(), 1328);
    }

    #[test]
    fn rejects_out_of_range_bundles() {
        assert!(UnitLayout::new(0).is_err());
        assert!(UnitLayout::new(MAX_PACKETS_PER_UNIT + 1).is_err());
        assert_eq!(UnitLayout::new(1).unwrap().unit_size(), TS_PACKET_SIZE);
    }

    #[test]
    fn whole_units_rounds_down() {
        let layout = UnitLayout::default();
        assert_eq!(layout.whole_units(5_000_000), 3799 * 1316);
        assert_eq!(layout.whole_units(1315), 0);
    }

    #[test]
    fn classifies_by_exact_length() {
        let layout = UnitLayout::default();

        let bare = vec![0x47u8; layout.unit_size()];
        assert_eq!(layout.classify(&bare), Framing::Bare { unit: &bare[..] });

        let mut rtp = vec![0x47u8; layout.rtp_unit_size()];
        rtp[..RTP_HEADER_SIZE].copy_from_slice(&[0x80, 33, 0, 9, 0, 0, 0, 0, 0, 0, 0, 1]);
        match layout.classify(&rtp) {
            Framing::Rtp { header, unit } => {
                assert_eq!(header.sequence, 9);
                assert_eq!(unit.len(), layout.unit_size());
            }
            other => panic!("expected rtp framing, got {:?}", other),
        }

        let odd = vec![0u8; layout.unit_size() - 1];
        assert_eq!(
            layout.classify(&odd),
            Framing::Unrecognised {
                len: layout.unit_size() - 1
            }
        );
        assert_eq!(layout.classify(&[]), Framing::Unrecognised { len: 0 });
    }
}
