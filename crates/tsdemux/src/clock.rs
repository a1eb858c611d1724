//! Program clock recovery from PCR samples.
//!
//! A [`ProgramClock`] stores `(pcr, packet_index)` samples for one program and
//! answers "what was the 27 MHz clock at packet N" by interpolating between
//! bracketing samples or extrapolating from the last two.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Default sample count after which stale samples are pruned.
pub const DEFAULT_MAX_PCR_SAMPLES: usize = 4096;

/// How an estimate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EstimateKind {
    /// A sample exists at the requested index.
    Exact,
    /// Linear interpolation between two bracketing samples.
    Interpolated,
    /// Linear extrapolation from the slope of the last two samples.
    Extrapolated,
}

/// A 27 MHz clock value for a packet index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PcrEstimate {
    /// Signed because extrapolating backwards may go below zero.
    pub value: i64,
    pub kind: EstimateKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PcrSample {
    pcr: i64,
    index: u64,
}

/// PCR sample store for one program.
#[derive(Debug, Clone)]
pub struct ProgramClock {
    samples: Vec<PcrSample>,
    /// Last index requested per stream PID, used for pruning.
    last_requested: HashMap<u16, u64>,
    /// Streams already reported as extrapolating.
    extrapolating: HashSet<u16>,
    max_samples: usize,
}

impl Default for ProgramClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PCR_SAMPLES)
    }
}

impl ProgramClock {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::new(),
            last_requested: HashMap::new(),
            extrapolating: HashSet::new(),
            max_samples: max_samples.max(2),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Latest sample as `(pcr, packet_index)`.
    pub fn last_sample(&self) -> Option<(u64, u64)> {
        self.samples.last().map(|s| (s.pcr as u64, s.index))
    }

    /// Record a PCR seen at `packet_index`. Absent PCRs are ignored.
    ///
    /// Samples are appended in call order; callers must not backfill.
    pub fn update(&mut self, pcr: Option<u64>, packet_index: u64) {
        let Some(pcr) = pcr else {
            return;
        };
        self.samples.push(PcrSample {
            pcr: pcr as i64,
            index: packet_index,
        });

        if self.samples.len() > self.max_samples {
            self.prune_stale();
            // Nobody is asking for old indices: keep a bounded window.
            if self.samples.len() > self.max_samples {
                let excess = self.samples.len() - self.max_samples;
                self.samples.drain(..excess);
            }
        }
    }

    /// Clock value at `packet_index`, or `None` while not enough samples exist.
    ///
    /// `stream_pid` of `None` asks for a whole-stream value and always
    /// extrapolates from the last two samples. A `Some` PID is remembered so
    /// [`prune_stale`](Self::prune_stale) keeps the samples it still needs.
    pub fn request_pcr(
        &mut self,
        stream_pid: Option<u16>,
        packet_index: u64,
    ) -> Option<PcrEstimate> {
        let estimate = self.estimate(stream_pid.is_some(), packet_index);
        if let Some(pid) = stream_pid {
            self.last_requested.insert(pid, packet_index);
            if estimate.is_some_and(|e| e.kind == EstimateKind::Extrapolated)
                && self.extrapolating.insert(pid)
            {
                warn!(pid, packet_index, "PCR extrapolated past the last sample");
            }
        }
        estimate
    }

    /// Clock value at `packet_index` as a stream would see it, without
    /// recording the request for pruning.
    pub fn pcr_at(&self, packet_index: u64) -> Option<PcrEstimate> {
        self.estimate(true, packet_index)
    }

    /// Stop keeping samples for a stream that is gone.
    pub fn forget_stream(&mut self, pid: u16) {
        self.last_requested.remove(&pid);
        self.extrapolating.remove(&pid);
    }

    fn estimate(&self, per_stream: bool, packet_index: u64) -> Option<PcrEstimate> {
        let n = self.samples.len();
        if let [only] = self.samples.as_slice() {
            return (only.index == packet_index).then_some(PcrEstimate {
                value: only.pcr,
                kind: EstimateKind::Exact,
            });
        }
        if n < 2 {
            return None;
        }

        let next = self.samples.iter().position(|s| s.index >= packet_index);
        let next = match next {
            Some(next) if per_stream => next,
            _ => return self.extrapolate(packet_index),
        };

        let hi = self.samples.get(next)?;
        if hi.index == packet_index {
            return Some(PcrEstimate {
                value: hi.pcr,
                kind: EstimateKind::Exact,
            });
        }
        // Before the first sample.
        let lo = next.checked_sub(1).and_then(|i| self.samples.get(i))?;
        Some(PcrEstimate {
            value: interpolate(lo, hi, packet_index),
            kind: EstimateKind::Interpolated,
        })
    }

    fn extrapolate(&self, packet_index: u64) -> Option<PcrEstimate> {
        let [.., prev, last] = self.samples.as_slice() else {
            return None;
        };
        let span = last.index as i64 - prev.index as i64;
        let step = if span == 0 {
            0
        } else {
            (last.pcr - prev.pcr) / span
        };
        let value = last.pcr + (packet_index as i64 - last.index as i64) * step;
        let kind = if packet_index == last.index {
            EstimateKind::Exact
        } else {
            EstimateKind::Extrapolated
        };
        Some(PcrEstimate { value, kind })
    }

    /// Drop samples older than the oldest index any stream still requests.
    ///
    /// The sample bracketing that index and at least two samples are kept.
    /// Returns the number of samples removed.
    pub fn prune_stale(&mut self) -> usize {
        let Some(&oldest) = self.last_requested.values().min() else {
            return 0;
        };
        let first_needed = self
            .samples
            .iter()
            .position(|s| s.index >= oldest)
            .unwrap_or(self.samples.len());
        let cut = first_needed
            .saturating_sub(1)
            .min(self.samples.len().saturating_sub(2));
        if cut > 0 {
            self.samples.drain(..cut);
            debug!(removed = cut, oldest, "Pruned stale PCR samples");
        }
        cut
    }
}

fn interpolate(lo: &PcrSample, hi: &PcrSample, packet_index: u64) -> i64 {
    let span = hi.index as i64 - lo.index as i64;
    if span == 0 {
        return lo.pcr;
    }
    lo.pcr + (hi.pcr - lo.pcr) * (packet_index as i64 - lo.index as i64) / span
}
