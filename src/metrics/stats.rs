use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::dispatch::BatchResult;

/// Counters and put latency for one run. Owned by the dispatching task.
pub struct RunStats {
    // Put call latency (microsecond precision)
    latency_hist: Histogram<u64>,

    pub chunks_submitted: u64,
    pub records_submitted: u64,
    pub records_failed: u64,
    pub bytes_submitted: u64,
    pub failures_by_code: BTreeMap<String, u64>,

    start_time: Instant,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            // 1us to 60s range, 3 significant digits
            latency_hist: Histogram::new_with_bounds(1, 60_000_000, 3)
                .expect("static histogram bounds are valid"),
            chunks_submitted: 0,
            records_submitted: 0,
            records_failed: 0,
            bytes_submitted: 0,
            failures_by_code: BTreeMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Record one accepted put call.
    pub fn record_chunk(&mut self, result: &BatchResult) {
        self.chunks_submitted += 1;
        self.records_submitted += result.record_count as u64;
        self.bytes_submitted += result.bytes as u64;
        self.records_failed += result.failed_count as u64;
        for (code, n) in &result.failures_by_code {
            *self.failures_by_code.entry(code.clone()).or_default() += n;
        }
        let _ = self.latency_hist.record((result.latency.as_micros() as u64).max(1));
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let hist = &self.latency_hist;
        let empty = hist.len() == 0;
        let q = |quantile: f64| if empty { 0 } else { hist.value_at_quantile(quantile) };
        StatsSnapshot {
            chunks_submitted: self.chunks_submitted,
            records_submitted: self.records_submitted,
            records_failed: self.records_failed,
            bytes_submitted: self.bytes_submitted,
            failures_by_code: self.failures_by_code.clone(),
            elapsed: self.start_time.elapsed(),
            put_latency_us_p50: q(0.5),
            put_latency_us_p99: q(0.99),
            put_latency_us_max: if empty { 0 } else { hist.max() },
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub chunks_submitted: u64,
    pub records_submitted: u64,
    pub records_failed: u64,
    pub bytes_submitted: u64,
    pub failures_by_code: BTreeMap<String, u64>,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub put_latency_us_p50: u64,
    pub put_latency_us_p99: u64,
    pub put_latency_us_max: u64,
}

impl StatsSnapshot {
    /// Records per second accepted by the stream over the run.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records_submitted.saturating_sub(self.records_failed) as f64 / secs
        } else {
            0.0
        }
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, failed: u32, latency_ms: u64) -> BatchResult {
        let mut failures_by_code = BTreeMap::new();
        if failed > 0 {
            failures_by_code.insert("InternalFailure".to_string(), failed as u64);
        }
        BatchResult {
            chunk_index: index,
            record_count: 3,
            failed_count: failed,
            bytes: 300,
            latency: Duration::from_millis(latency_ms),
            failures_by_code,
        }
    }

    #[test]
    fn aggregates_failures_by_code() {
        let mut stats = RunStats::new();
        stats.record_chunk(&chunk(0, 2, 5));
        stats.record_chunk(&chunk(1, 0, 7));
        let snap = stats.snapshot();
        assert_eq!(snap.chunks_submitted, 2);
        assert_eq!(snap.records_submitted, 6);
        assert_eq!(snap.records_failed, 2);
        assert_eq!(snap.bytes_submitted, 600);
        assert_eq!(snap.failures_by_code["InternalFailure"], 2);
        assert!(snap.put_latency_us_max >= 7_000);
    }

    #[test]
    fn empty_stats_report_zero_latency() {
        let snap = RunStats::new().snapshot();
        assert_eq!(snap.put_latency_us_p50, 0);
        assert_eq!(snap.put_latency_us_max, 0);
    }
}
