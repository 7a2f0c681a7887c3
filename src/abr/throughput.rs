//! Per-client throughput estimation.

use dashmap::DashMap;

/// One accepted fragment report, folded into the running average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    /// Throughput of this fragment alone, in kbps.
    pub instant_kbps: f64,
    /// The EWMA after folding this fragment in, in kbps.
    pub average_kbps: f64,
}

/// EWMA throughput table keyed by the client's opaque identifier.
///
/// Entries are created on first report and live for the process lifetime;
/// the identifier is stable across one playback session by client contract.
#[derive(Debug)]
pub struct ThroughputTracker {
    alpha: f64,
    averages: DashMap<String, f64>,
}

impl ThroughputTracker {
    /// Create a tracker with the given smoothing constant in [0, 1].
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            averages: DashMap::new(),
        }
    }

    /// Fold one fragment report into the client's running average.
    ///
    /// Instantaneous throughput is `size/1000 * 8 / ((end-start)/1000)` kbps;
    /// the average starts at 0 before the first report. The caller must have
    /// validated `end_ms > start_ms`.
    pub fn record(
        &self,
        uuid: &str,
        fragment_size: u64,
        start_ms: u64,
        end_ms: u64,
    ) -> ThroughputSample {
        let instant =
            (fragment_size as f64 / 1000.0 * 8.0) / ((end_ms - start_ms) as f64 / 1000.0);
        let mut average = self.averages.entry(uuid.to_string()).or_insert(0.0);
        *average = self.alpha * instant + (1.0 - self.alpha) * *average;
        ThroughputSample {
            instant_kbps: instant,
            average_kbps: *average,
        }
    }

    /// The client's current estimate in kbps, 0 before any report.
    pub fn estimate(&self, uuid: &str) -> f64 {
        self.averages.get(uuid).map(|avg| *avg).unwrap_or(0.0)
    }
}
