//! End-of-stream report.

use crate::packet::TS_PACKET_SIZE;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 27 MHz system clock.
pub const SYSTEM_CLOCK_HZ: f64 = 27_000_000.0;

const PACKET_BITS: f64 = (TS_PACKET_SIZE * 8) as f64;

/// Packet count and rate of one PID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PidStats {
    pub pid: u16,
    pub packets: u64,
    /// Bits per second, when the stream duration is known.
    pub bitrate: Option<f64>,
    /// Packets per second.
    pub frequency: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSummary {
    pub total_packets: u64,
    /// Duration in 27 MHz ticks.
    pub duration: Option<i64>,
    pub duration_secs: Option<f64>,
    pub pids: Vec<PidStats>,
    /// Units still assembling when the stream ended.
    pub discarded_units: usize,
    pub continuity_issues: usize,
}

impl StreamSummary {
    pub fn new(
        packet_counts: &BTreeMap<u16, u64>,
        duration: Option<i64>,
        discarded_units: usize,
        continuity_issues: usize,
    ) -> Self {
        let duration = duration.filter(|&d| d > 0);
        let pids = packet_counts
            .iter()
            .map(|(&pid, &packets)| {
                let bitrate =
                    duration.map(|d| packets as f64 * PACKET_BITS * SYSTEM_CLOCK_HZ / d as f64);
                PidStats {
                    pid,
                    packets,
                    bitrate,
                    frequency: bitrate.map(|rate| rate / PACKET_BITS),
                }
            })
            .collect();

        StreamSummary {
            total_packets: packet_counts.values().sum(),
            duration,
            duration_secs: duration.map(|d| d as f64 / SYSTEM_CLOCK_HZ),
            pids,
            discarded_units,
            continuity_issues,
        }
    }

    pub fn pid(&self, pid: u16) -> Option<&PidStats> {
        self.pids.iter().find(|s| s.pid == pid)
    }

    /// Overall bitrate in bits per second.
    pub fn bitrate(&self) -> Option<f64> {
        self.duration
            .map(|d| self.total_packets as f64 * PACKET_BITS * SYSTEM_CLOCK_HZ / d as f64)
    }
}

impl fmt::Display for StreamSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration_secs {
            Some(secs) => writeln!(f, "Duration: {secs:.3} s")?,
            None => writeln!(f, "Duration: unknown")?,
        }
        writeln!(f, "Packets: {}", self.total_packets)?;
        if let Some(rate) = self.bitrate() {
            writeln!(f, "Bitrate: {:.0} bps", rate)?;
        }
        writeln!(
            f,
            "{:>6} | {:>10} | {:>14} | {:>10}",
            "PID", "Packets", "Bitrate (bps)", "Pkt/s"
        )?;
        for stats in &self.pids {
            let bitrate = stats
                .bitrate
                .map_or_else(|| "-".to_string(), |v| format!("{v:.0}"));
            let frequency = stats
                .frequency
                .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
            writeln!(
                f,
                "{:>6} | {:>10} | {:>14} | {:>10}",
                format!("0x{:04X}", stats.pid),
                stats.packets,
                bitrate,
                frequency
            )?;
        }
        if self.discarded_units > 0 {
            writeln!(f, "Discarded partial units: {}", self.discarded_units)?;
        }
        if self.continuity_issues > 0 {
            writeln!(f, "Continuity issues: {}", self.continuity_issues)?;
        }
        Ok(())
    }
}
