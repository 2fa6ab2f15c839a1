//! Performance metrics for the RPC server.
//!
//! Lightweight, thread-safe collection: atomic totals, a bounded rolling
//! window of call latencies for percentile reporting, a bounded ring of
//! recent slow calls, and per-method counters. One instance per server,
//! shared behind `Arc`; recording a call is O(1) amortized.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Rolling window size for percentile calculation.
const LATENCY_WINDOW_SIZE: usize = 1000;

/// How many recent slow calls are retained.
const MAX_SLOW_CALLS: usize = 10;

/// Calls at or above this duration are tracked as slow.
pub const SLOW_CALL_THRESHOLD_MS: u64 = 100;

#[derive(Debug, Default)]
struct OpEntry {
    count: u64,
    total_ms: u64,
}

/// A recorded slow call.
#[derive(Clone, Debug, PartialEq)]
pub struct SlowCall {
    pub method: String,
    pub duration_ms: u64,
    /// Milliseconds since metrics collection started.
    pub timestamp_ms: u64,
}

/// Point-in-time copy of all metrics, safe to serialize or log.
#[derive(Clone, Debug, Default)]
pub struct MetricsSnapshot {
    pub call_count: u64,
    pub slow_call_count: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub avg_ms: u64,
    pub top_slow_calls: Vec<SlowCall>,
    pub uptime_secs: u64,
    /// Top methods by call count: (method, count, average ms).
    pub method_stats: Vec<(String, u64, u64)>,
}

/// Thread-safe metrics collector.
pub struct Metrics {
    call_count: AtomicU64,
    slow_call_count: AtomicU64,
    latency_sum_ms: AtomicU64,
    latencies_ms: Mutex<VecDeque<u64>>,
    per_method: Mutex<HashMap<String, OpEntry>>,
    slow_calls: Mutex<VecDeque<SlowCall>>,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            call_count: AtomicU64::new(0),
            slow_call_count: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latencies_ms: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW_SIZE)),
            per_method: Mutex::new(HashMap::new()),
            slow_calls: Mutex::new(VecDeque::with_capacity(MAX_SLOW_CALLS)),
            started_at: Instant::now(),
        }
    }

    /// Record one completed call.
    pub fn record_call(&self, method: &str, duration_ms: u64) {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        {
            let mut per_method = self.per_method.lock().unwrap();
            let entry = per_method.entry(method.to_string()).or_default();
            entry.count += 1;
            entry.total_ms += duration_ms;
        }

        {
            let mut latencies = self.latencies_ms.lock().unwrap();
            if latencies.len() >= LATENCY_WINDOW_SIZE {
                if let Some(old) = latencies.pop_front() {
                    self.latency_sum_ms.fetch_sub(old, Ordering::Relaxed);
                }
            }
            latencies.push_back(duration_ms);
            self.latency_sum_ms.fetch_add(duration_ms, Ordering::Relaxed);
        }

        if duration_ms >= SLOW_CALL_THRESHOLD_MS {
            self.slow_call_count.fetch_add(1, Ordering::Relaxed);
            let mut slow = self.slow_calls.lock().unwrap();
            if slow.len() >= MAX_SLOW_CALLS {
                slow.pop_front();
            }
            slow.push_back(SlowCall {
                method: method.to_string(),
                duration_ms,
                timestamp_ms: self.started_at.elapsed().as_millis() as u64,
            });
        }
    }

    /// Take a point-in-time snapshot. O(window size) for the percentile
    /// sort, paid only when a snapshot is requested.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (p50, p95, p99, avg) = {
            let latencies = self.latencies_ms.lock().unwrap();
            if latencies.is_empty() {
                (0, 0, 0, 0)
            } else {
                let mut sorted: Vec<u64> = latencies.iter().copied().collect();
                sorted.sort_unstable();
                let len = sorted.len();
                (
                    sorted[len * 50 / 100],
                    sorted[len * 95 / 100],
                    sorted.get(len * 99 / 100).copied().unwrap_or(sorted[len - 1]),
                    self.latency_sum_ms.load(Ordering::Relaxed) / len as u64,
                )
            }
        };

        let mut method_stats: Vec<(String, u64, u64)> = {
            let per_method = self.per_method.lock().unwrap();
            per_method
                .iter()
                .map(|(name, e)| (name.clone(), e.count, e.total_ms / e.count.max(1)))
                .collect()
        };
        method_stats.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        method_stats.truncate(5);

        MetricsSnapshot {
            call_count: self.call_count.load(Ordering::Relaxed),
            slow_call_count: self.slow_call_count.load(Ordering::Relaxed),
            p50_ms: p50,
            p95_ms: p95,
            p99_ms: p99,
            avg_ms: avg,
            top_slow_calls: self.slow_calls.lock().unwrap().iter().cloned().collect(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            method_stats,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
