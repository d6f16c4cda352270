use std::time::Duration;

use uuid::Uuid;

use crate::catalog::PolicyCategory;
use crate::config::Mode;
use crate::refine::StopReason;

/// Events the observer can record
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    RunStart {
        run_id: Uuid,
        mode: Mode,
    },
    StepAccepted {
        run_id: Uuid,
        step: usize,
        delta: f64,
    },
    CandidateRejected {
        run_id: Uuid,
        step: usize,
        delta: f64,
        reason: String,
    },
    ProviderFailed {
        run_id: Uuid,
        timed_out: bool,
        message: String,
    },
    PolicyShortCircuit {
        run_id: Uuid,
        category: PolicyCategory,
    },
    RunEnd {
        run_id: Uuid,
        stop_reason: StopReason,
        steps: usize,
        duration: Duration,
    },
    Error {
        component: String,
        message: String,
    },
}

/// Numeric metrics
#[derive(Debug, Clone)]
pub enum ObserverMetric {
    RefinementLatency(Duration),
    ImprovementDelta(f64),
}

/// Core observability trait, implemented by every backend
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
