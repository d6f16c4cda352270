use super::traits::{Observer, ObserverEvent, ObserverMetric};
use tracing::{info, warn};

/// Emits every event as a structured tracing record
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::RunStart { run_id, mode } => {
                info!(run_id = %run_id, mode = %mode, "refine.start");
            }
            ObserverEvent::StepAccepted {
                run_id,
                step,
                delta,
            } => {
                info!(run_id = %run_id, step = step, delta = delta, "refine.step_accepted");
            }
            ObserverEvent::CandidateRejected {
                run_id,
                step,
                delta,
                reason,
            } => {
                info!(
                    run_id = %run_id,
                    step = step,
                    delta = delta,
                    reason = %reason,
                    "refine.candidate_rejected"
                );
            }
            ObserverEvent::ProviderFailed {
                run_id,
                timed_out,
                message,
            } => {
                warn!(run_id = %run_id, timed_out = timed_out, error = %message, "refine.provider_failed");
            }
            ObserverEvent::PolicyShortCircuit { run_id, category } => {
                info!(run_id = %run_id, category = %category, "refine.policy_short_circuit");
            }
            ObserverEvent::RunEnd {
                run_id,
                stop_reason,
                steps,
                duration,
            } => {
                info!(
                    run_id = %run_id,
                    stop_reason = %stop_reason,
                    steps = steps,
                    duration_ms = millis(*duration),
                    "refine.end"
                );
            }
            ObserverEvent::Error { component, message } => {
                warn!(component = %component, error = %message, "error");
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::RefinementLatency(d) => {
                info!(latency_ms = millis(*d), "metric.refinement_latency");
            }
            ObserverMetric::ImprovementDelta(delta) => {
                info!(delta = delta, "metric.improvement_delta");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
