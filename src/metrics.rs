use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock, RwLock,
    },
    time::{Duration, Instant},
};

/// In-process metrics registry.
///
/// Counters track tick/module outcomes, gauges hold last-seen chain values
/// (block height, balances), histograms hold per-module run latencies.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
    histograms: RwLock<HashMap<String, Arc<RwLock<Vec<u64>>>>>,
    gauges: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by 1.
    pub fn increment_counter(&self, name: &str) {
        let counters = self.counters.read().unwrap();
        if let Some(counter) = counters.get(name) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(counters);
            let mut counters = self.counters.write().unwrap();
            let counter = counters
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AtomicU64::new(0)));
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn set_gauge(&self, name: &str, value: u64) {
        let gauges = self.gauges.read().unwrap();
        if let Some(gauge) = gauges.get(name) {
            gauge.store(value, Ordering::Relaxed);
        } else {
            drop(gauges);
            let mut gauges = self.gauges.write().unwrap();
            let gauge = gauges
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AtomicU64::new(0)));
            gauge.store(value, Ordering::Relaxed);
        }
    }

    /// Record a duration in milliseconds.
    pub fn record_histogram(&self, name: &str, duration: Duration) {
        let millis = duration.as_millis() as u64;
        let histograms = self.histograms.read().unwrap();
        if let Some(histogram) = histograms.get(name) {
            let mut hist = histogram.write().unwrap();
            hist.push(millis);
            // Keep only the last 1000 values to prevent unbounded growth
            if hist.len() > 1000 {
                hist.drain(0..500);
            }
        } else {
            drop(histograms);
            let mut histograms = self.histograms.write().unwrap();
            let histogram = histograms
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(Vec::new())));
            let mut hist = histogram.write().unwrap();
            hist.push(millis);
        }
    }

    pub fn get_counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .unwrap()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_gauge(&self, name: &str) -> u64 {
        self.gauges
            .read()
            .unwrap()
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_histogram_stats(&self, name: &str) -> Option<HistogramStats> {
        let histograms = self.histograms.read().unwrap();
        histograms.get(name).and_then(|h| {
            let hist = h.read().unwrap();
            if hist.is_empty() {
                return None;
            }
            let mut sorted = hist.clone();
            sorted.sort_unstable();
            let len = sorted.len();
            Some(HistogramStats {
                count: len as u64,
                min: sorted[0],
                max: sorted[len - 1],
                p50: sorted[len / 2],
                p95: sorted[len * 95 / 100],
                p99: sorted[len * 99 / 100],
            })
        })
    }
}

#[derive(Debug, Clone)]
pub struct HistogramStats {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

static GLOBAL_METRICS: OnceLock<MetricsRegistry> = OnceLock::new();

/// Global metrics registry.
pub fn metrics() -> &'static MetricsRegistry {
    GLOBAL_METRICS.get_or_init(MetricsRegistry::new)
}

/// Timer helper for measuring run latencies.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        metrics().record_histogram(&self.name, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_operations() {
        let registry = MetricsRegistry::new();
        registry.increment_counter("ticks_total");
        registry.increment_counter("ticks_total");
        assert_eq!(registry.get_counter("ticks_total"), 2);
        assert_eq!(registry.get_counter("missing"), 0);
    }

    #[test]
    fn gauge_operations() {
        let registry = MetricsRegistry::new();
        registry.set_gauge("block_height", 42);
        assert_eq!(registry.get_gauge("block_height"), 42);
        registry.set_gauge("block_height", 100);
        assert_eq!(registry.get_gauge("block_height"), 100);
    }

    #[test]
    fn histogram_operations() {
        let registry = MetricsRegistry::new();
        registry.record_histogram("module_run_ms", Duration::from_millis(100));
        registry.record_histogram("module_run_ms", Duration::from_millis(200));
        registry.record_histogram("module_run_ms", Duration::from_millis(150));

        let stats = registry.get_histogram_stats("module_run_ms").unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 100);
        assert_eq!(stats.max, 200);
    }
}
