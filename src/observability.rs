//! Correlation ids for tying one scheduler tick's log lines together.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Correlation id attached to every log line produced within one tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        let counter = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "coordinator-{}-{}",
            Utc::now().timestamp_millis(),
            counter
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}
