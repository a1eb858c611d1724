//! Per-PID continuity counter tracking.

use crate::packet::{PID_NULL, TsHeader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Continuity counter status for a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuityStatus {
    /// First packet seen for this PID
    Initial,
    /// Continuity is correct
    Ok,
    /// Discontinuity detected
    Discontinuity { expected: u8, actual: u8 },
    /// Duplicate packet (same CC as previous)
    Duplicate,
}

impl ContinuityStatus {
    pub fn is_issue(&self) -> bool {
        matches!(self, Self::Discontinuity { .. } | Self::Duplicate)
    }
}

/// Continuity counter handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuityMode {
    /// Do not evaluate continuity counters.
    #[default]
    Disabled,
    /// Validate continuity counters and report issues as diagnostics.
    Warn,
    /// Validate continuity counters and fail delivery on the first issue.
    Strict,
}

/// Last continuity counter per PID plus issue counters.
///
/// Only packets carrying a payload advance the counter. Adaptation-only
/// packets must repeat the previous value.
#[derive(Debug, Default, Clone)]
pub struct ContinuityTracker {
    last: HashMap<u16, u8>,
    duplicates: usize,
    discontinuities: usize,
}

impl ContinuityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, header: &TsHeader) -> ContinuityStatus {
        if header.pid == PID_NULL {
            return ContinuityStatus::Ok;
        }

        let cc = header.continuity_counter;
        let Some(&last_cc) = self.last.get(&header.pid) else {
            self.last.insert(header.pid, cc);
            return ContinuityStatus::Initial;
        };

        let status = if header.has_payload() {
            let expected = (last_cc + 1) & 0x0F;
            if cc == expected {
                ContinuityStatus::Ok
            } else if cc == last_cc {
                ContinuityStatus::Duplicate
            } else {
                ContinuityStatus::Discontinuity {
                    expected,
                    actual: cc,
                }
            }
        } else if cc == last_cc {
            ContinuityStatus::Ok
        } else {
            ContinuityStatus::Discontinuity {
                expected: last_cc,
                actual: cc,
            }
        };

        match status {
            ContinuityStatus::Duplicate => self.duplicates += 1,
            ContinuityStatus::Discontinuity { .. } => {
                self.discontinuities += 1;
                self.last.insert(header.pid, cc);
            }
            _ => {
                self.last.insert(header.pid, cc);
            }
        }
        status
    }

    pub fn last_counter(&self, pid: u16) -> Option<u8> {
        self.last.get(&pid).copied()
    }

    pub fn issue_count(&self) -> usize {
        self.duplicates + self.discontinuities
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    pub fn discontinuity_count(&self) -> usize {
        self.discontinuities
    }

    /// Drop the counter of a PID that left the stream.
    pub fn forget(&mut self, pid: u16) {
        self.last.remove(&pid);
    }

    pub fn reset(&mut self) {
        self.last.clear();
        self.duplicates = 0;
        self.discontinuities = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(pid: u16, cc: u8, adaptation_field_control: u8) -> TsHeader {
        TsHeader {
            transport_error_indicator: false,
            payload_unit_start_indicator: false,
            transport_priority: false,
            pid,
            transport_scrambling_control: 0,
            adaptation_field_control,
            continuity_counter: cc,
        }
    }

    #[test]
    fn test_sequential_counters_are_ok() {
        let mut tracker = ContinuityTracker::new();
        assert_eq!(tracker.check(&header(0x33, 14, 1)), ContinuityStatus::Initial);
        assert_eq!(tracker.check(&header(0x33, 15, 1)), ContinuityStatus::Ok);
        assert_eq!(tracker.check(&header(0x33, 0, 1)), ContinuityStatus::Ok);
        assert_eq!(tracker.issue_count(), 0);
    }

    #[test]
    fn test_gap_is_discontinuity() {
        let mut tracker = ContinuityTracker::new();
        tracker.check(&header(0x33, 0, 1));
        assert_eq!(
            tracker.check(&header(0x33, 2, 1)),
            ContinuityStatus::Discontinuity {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(tracker.check(&header(0x33, 3, 1)), ContinuityStatus::Ok);
        assert_eq!(tracker.discontinuity_count(), 1);
    }

    #[test]
    fn test_repeat_is_duplicate() {
        let mut tracker = ContinuityTracker::new();
        tracker.check(&header(0x33, 7, 3));
        assert_eq!(tracker.check(&header(0x33, 7, 3)), ContinuityStatus::Duplicate);
        assert_eq!(tracker.duplicate_count(), 1);
        assert_eq!(tracker.last_counter(0x33), Some(7));
    }

    #[test]
    fn test_adaptation_only_requires_constant_cc() {
        let mut tracker = ContinuityTracker::new();
        tracker.check(&header(0x33, 5, 2));
        assert_eq!(tracker.check(&header(0x33, 5, 2)), ContinuityStatus::Ok);
        assert_eq!(
            tracker.check(&header(0x33, 6, 2)),
            ContinuityStatus::Discontinuity {
                expected: 5,
                actual: 6
            }
        );
    }

    #[test]
    fn test_pids_are_independent_and_null_ignored() {
        let mut tracker = ContinuityTracker::new();
        tracker.check(&header(0x100, 0, 1));
        tracker.check(&header(0x101, 9, 1));
        assert_eq!(tracker.check(&header(0x100, 1, 1)), ContinuityStatus::Ok);
        assert_eq!(tracker.check(&header(PID_NULL, 3, 1)), ContinuityStatus::Ok);
        assert_eq!(tracker.check(&header(PID_NULL, 3, 1)), ContinuityStatus::Ok);
        assert_eq!(tracker.last_counter(PID_NULL), None);
    }
}
