//! Run Metrics Collection
//!
//! Aggregates reasoning-service usage across a pipeline run. Thread-safe so
//! concurrent units can record without coordination.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = MetricsCollector::new();
//! metrics.record_usage(&response.usage);
//! info!("{}", metrics.summary().display());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use crate::ai::provider::TokenUsage;

// =============================================================================
// Metrics Collector
// =============================================================================

/// Lock-free counters for one pipeline run
pub struct MetricsCollector {
    start_time: Instant,
    api_calls: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    /// Units answered from the cache without a service call
    cache_hits: AtomicU32,
    /// Units that failed after retries
    failed_units: AtomicU32,
}

/// Summary statistics for a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cache_hits: u32,
    pub failed_units: u32,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            cache_hits: AtomicU32::new(0),
            failed_units: AtomicU32::new(0),
        }
    }

    /// Record one service call and its token usage
    pub fn record_usage(&self, usage: &TokenUsage) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens as u64, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_units.fetch_add(1, Ordering::Relaxed);
    }

    /// Current metrics snapshot
    pub fn summary(&self) -> MetricsSummary {
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);

        MetricsSummary {
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls: self.api_calls.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            failed_units: self.failed_units.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Duration: {:.1}s | API calls: {} | Tokens: {} (input: {}, output: {}) | Cache hits: {} | Failed units: {}",
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.cache_hits,
            self.failed_units
        )
    }
}

// =============================================================================
// Shared Type
// =============================================================================

/// Shared metrics collector for pipeline stages
pub type SharedMetrics = Arc<MetricsCollector>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_usage() {
        let metrics = MetricsCollector::new();
        metrics.record_usage(&TokenUsage::new(100, 50));
        metrics.record_cache_hit();

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1);
        assert_eq!(summary.input_tokens, 100);
        assert_eq!(summary.output_tokens, 50);
        assert_eq!(summary.total_tokens, 150);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.failed_units, 0);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = Arc::new(MetricsCollector::new());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_usage(&TokenUsage::new(10, 5));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1000);
        assert_eq!(summary.input_tokens, 10000);
        assert_eq!(summary.output_tokens, 5000);
    }

    #[test]
    fn test_summary_display() {
        let metrics = MetricsCollector::new();
        metrics.record_usage(&TokenUsage::new(1000, 500));
        metrics.record_failure();

        let display = metrics.summary().display();
        assert!(display.contains("1500"));
        assert!(display.contains("Failed units: 1"));
    }
}
