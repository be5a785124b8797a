use serde::Serialize;
use std::sync::Mutex;

/// Counters for period loads, shared between the engine and dataset provider.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub fetches_issued: usize,
    pub periods_applied: usize,
    pub stale_discarded: usize,
    pub fallbacks_served: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_fetch_issued(&self) {
        self.update(|metrics| metrics.fetches_issued += 1);
    }

    pub fn record_period_applied(&self) {
        self.update(|metrics| metrics.periods_applied += 1);
    }

    pub fn record_stale_discarded(&self) {
        self.update(|metrics| metrics.stale_discarded += 1);
    }

    pub fn record_fallback(&self) {
        self.update(|metrics| metrics.fallbacks_served += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.inner.lock() {
            Ok(metrics) => *metrics,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        match self.inner.lock() {
            Ok(mut metrics) => apply(&mut metrics),
            Err(poisoned) => apply(&mut poisoned.into_inner()),
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
