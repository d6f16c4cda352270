use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::StopReason;

/// Aggregate counters across all runs of one controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_runs: u64,
    /// Runs that did not end with `error`.
    pub successful_runs: u64,
    pub average_improvement: f64,
    #[serde(with = "duration_secs_f64")]
    pub average_latency: Duration,
    pub stop_reasons: BTreeMap<StopReason, u64>,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Mutex-guarded stats; each completed run is folded in under one lock.
#[derive(Debug, Default)]
pub(crate) struct StatsTracker {
    inner: Mutex<PerformanceStats>,
}

impl StatsTracker {
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn record(&self, stop_reason: StopReason, improvement: f64, latency: Duration) {
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        stats.total_runs += 1;
        if stop_reason != StopReason::Error {
            stats.successful_runs += 1;
        }
        let n = stats.total_runs as f64;
        stats.average_improvement += (improvement - stats.average_improvement) / n;
        let avg = stats.average_latency.as_secs_f64();
        stats.average_latency =
            Duration::try_from_secs_f64(avg + (latency.as_secs_f64() - avg) / n).unwrap_or_default();
        *stats.stop_reasons.entry(stop_reason).or_insert(0) += 1;
        stats.last_run_at = Some(Utc::now());
    }

    pub(crate) fn snapshot(&self) -> PerformanceStats {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn reset(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = PerformanceStats::default();
    }
}

mod duration_secs_f64 {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::try_from_secs_f64(secs).unwrap_or_default())
    }
}
