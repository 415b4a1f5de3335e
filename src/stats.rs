//! Ingest counters.

use anyhow::Result;
use serde::Serialize;
use std::fmt;

/// Snapshot of the five stream-integrity counters.
///
/// Every counter only grows until the ingest is flushed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Units accepted from the network (bare or RTP-framed).
    pub packet_count: u64,
    /// TS packets with the transport error indicator set.
    pub transport_error_count: u64,
    /// RTP sequence gaps.
    pub network_error_count: u64,
    /// TS continuity-counter discontinuities.
    pub continuity_error_count: u64,
    /// Units dropped because the ring was full.
    pub overflow_error_count: u64,
}

impl IngestStats {
    pub fn error_count(&self) -> u64 {
        self.transport_error_count
            + self.network_error_count
            + self.continuity_error_count
            + self.overflow_error_count
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packets={} network_errors={} transport_errors={} continuity_errors={} overflow_errors={}",
            self.packet_count,
            self.network_error_count,
            self.transport_error_count,
            self.continuity_error_count,
            self.overflow_error_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_counter() {
        let stats = IngestStats {
            packet_count: 10,
            transport_error_count: 1,
            network_error_count: 2,
            continuity_error_count: 3,
            overflow_error_count: 4,
        };
        assert_eq!(
            stats.to_string(),
            "packets=10 network_errors=2 transport_errors=1 continuity_errors=3 overflow_errors=4"
        );
        assert_eq!(stats.error_count(), 10);
    }

    #[test]
    fn json_uses_field_names() {
        let stats = IngestStats {
            overflow_error_count: 1,
            ..IngestStats::default()
        };
        let value: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
        assert_eq!(value["overflow_error_count"], 1);
        assert_eq!(value["packet_count"], 0);
    }
}
