use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::engage;
use super::provider::{Diagnosis, ImprovementProvider};
use super::stats::{PerformanceStats, StatsTracker};
use super::types::{EnhanceOptions, RefinementResult, RequestContext, StepRecord, StopReason};
use crate::catalog::PatternCatalog;
use crate::config::{EngineConfig, Mode, RefineConfig};
use crate::error::{ConfigError, ProviderError};
use crate::observability::{Observer, ObserverEvent, ObserverMetric, create_observer};
use crate::policy::PolicyFilter;
use crate::scoring::{FeatureScorer, ResponseScorer, ScoreVector};

// ── Public types ─────────────────────────────────────────────────────────────

/// Runs the bounded score → propose → rescore loop for one response at a
/// time and keeps aggregate counters across runs.
///
/// Shareable across tasks: all per-request state lives in the `enhance`
/// future, and the only shared mutable state is the stats tracker.
pub struct ReflectionController {
    fast: EngineConfig,
    normal: EngineConfig,
    deep: EngineConfig,
    scorer: Arc<dyn ResponseScorer>,
    filter: Arc<PolicyFilter>,
    provider: Arc<dyn ImprovementProvider>,
    observer: Arc<dyn Observer>,
    stats: StatsTracker,
}

// ── Internal types ───────────────────────────────────────────────────────────

/// Accumulated state of one run.
struct LoopState {
    best_text: String,
    best_score: ScoreVector,
    trace: Vec<StepRecord>,
    provider_calls: usize,
}

/// What came back from one provider call.
enum ProviderOutcome {
    Candidate(String),
    Nothing,
    Failed(ProviderError),
    Cancelled,
}

/// Why a candidate was not accepted.
#[derive(Debug, Clone, Copy)]
enum Rejection {
    TooLarge,
    SafetyFloor,
    BelowEpsilon,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Self::TooLarge => "output_too_large",
            Self::SafetyFloor => "safety_floor",
            Self::BelowEpsilon => "insufficient_improvement",
        }
    }
}

// ── Implementation ───────────────────────────────────────────────────────────

impl ReflectionController {
    /// Resolve one `EngineConfig` per mode from `config` and validate them.
    pub fn new(
        config: &RefineConfig,
        scorer: Arc<dyn ResponseScorer>,
        filter: Arc<PolicyFilter>,
        provider: Arc<dyn ImprovementProvider>,
        observer: Arc<dyn Observer>,
    ) -> Result<Self, ConfigError> {
        let [fast, normal, deep] = Mode::ALL.map(|mode| config.engine_config(mode));
        for engine in [&fast, &normal, &deep] {
            engine.validate()?;
        }
        Ok(Self {
            fast,
            normal,
            deep,
            scorer,
            filter,
            provider,
            observer,
            stats: StatsTracker::default(),
        })
    }

    /// Wire the built-in scorer, filter and observer from `config`.
    pub fn from_config(
        config: &RefineConfig,
        provider: Arc<dyn ImprovementProvider>,
    ) -> anyhow::Result<Self> {
        let catalog = PatternCatalog::from_config(config)?;
        let catalog = Arc::new(catalog);
        let scorer = Arc::new(FeatureScorer::new(
            Arc::clone(&catalog),
            config.scorer.clone(),
        ));
        let filter = Arc::new(PolicyFilter::new(catalog, &config.policy.default_locale));
        let observer: Arc<dyn Observer> = Arc::from(create_observer(&config.observability));
        Ok(Self::new(config, scorer, filter, provider, observer)?)
    }

    pub fn engine_config(&self, mode: Mode) -> &EngineConfig {
        match mode {
            Mode::Fast => &self.fast,
            Mode::Normal => &self.normal,
            Mode::Deep => &self.deep,
        }
    }

    pub fn filter(&self) -> &PolicyFilter {
        &self.filter
    }

    /// Cheap pre-check; see [`engage::should_engage`].
    pub fn should_engage(&self, query: &str, _ctx: &RequestContext) -> bool {
        engage::should_engage(query, self.filter.catalog())
    }

    /// Refine `response` within the `mode` budget.
    pub async fn enhance(
        &self,
        response: &str,
        query: &str,
        ctx: &RequestContext,
        mode: Mode,
    ) -> RefinementResult {
        self.enhance_with(response, query, ctx, mode, EnhanceOptions::default())
            .await
    }

    /// [`Self::enhance`] with an upstream deadline and/or cancellation token.
    ///
    /// Never fails. Any panic inside the run returns the original response
    /// unchanged with `stop_reason = error`.
    pub async fn enhance_with(
        &self,
        response: &str,
        query: &str,
        ctx: &RequestContext,
        mode: Mode,
        opts: EnhanceOptions,
    ) -> RefinementResult {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        self.observer
            .record_event(&ObserverEvent::RunStart { run_id, mode });

        let span = tracing::info_span!(
            "refine",
            run_id = %run_id,
            mode = %mode,
            provider = self.provider.name()
        );
        let outcome = AssertUnwindSafe(self.run(run_id, response, query, ctx, mode, &opts, started))
            .catch_unwind()
            .instrument(span)
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(run_id = %run_id, error = %message, "refinement run panicked");
                self.observer.record_event(&ObserverEvent::Error {
                    component: "controller".into(),
                    message,
                });
                RefinementResult {
                    run_id,
                    mode,
                    final_response: response.to_string(),
                    original_score: None,
                    final_score: None,
                    improvement_delta: 0.0,
                    steps_taken: 0,
                    provider_calls: 0,
                    elapsed: started.elapsed(),
                    stop_reason: StopReason::Error,
                    trace: Vec::new(),
                    verdict: None,
                }
            }
        };

        self.stats
            .record(result.stop_reason, result.improvement_delta, result.elapsed);
        self.observer.record_event(&ObserverEvent::RunEnd {
            run_id,
            stop_reason: result.stop_reason,
            steps: result.steps_taken,
            duration: result.elapsed,
        });
        self.observer
            .record_metric(&ObserverMetric::RefinementLatency(result.elapsed));
        self.observer
            .record_metric(&ObserverMetric::ImprovementDelta(result.improvement_delta));
        result
    }

    pub fn get_performance_stats(&self) -> PerformanceStats {
        self.stats.snapshot()
    }

    pub fn reset_performance_stats(&self) {
        self.stats.reset();
    }

    #[allow(clippy::too_many_arguments, clippy::too_many_lines)]
    async fn run(
        &self,
        run_id: Uuid,
        response: &str,
        query: &str,
        ctx: &RequestContext,
        mode: Mode,
        opts: &EnhanceOptions,
        started: Instant,
    ) -> RefinementResult {
        let config = self.engine_config(mode);

        if let (true, Some(category)) = self.filter.should_use_policy_response(query) {
            tracing::info!(category = %category, "policy-sensitive query, skipping refinement");
            self.observer
                .record_event(&ObserverEvent::PolicyShortCircuit { run_id, category });
            return RefinementResult {
                run_id,
                mode,
                final_response: self.filter.policy_reply(Some(category), &ctx.locale),
                original_score: None,
                final_score: None,
                improvement_delta: 0.0,
                steps_taken: 0,
                provider_calls: 0,
                elapsed: started.elapsed(),
                stop_reason: StopReason::PolicyResponse,
                trace: Vec::new(),
                verdict: None,
            };
        }

        let original = self.scorer.score(response, query, ctx, &config.weights);
        tracing::debug!(total = original.total, weakest = %original.weakest(), "scored original");
        let mut state = LoopState {
            best_text: response.to_string(),
            best_score: original.clone(),
            trace: Vec::new(),
            provider_calls: 0,
        };

        let stop_reason = loop {
            if out_of_time(config, started, opts) {
                break StopReason::Timeout;
            }
            if state.trace.len() >= config.max_steps as usize
                || state.provider_calls >= config.tool_call_cap as usize
            {
                break StopReason::MaxStepsReached;
            }

            let step = state.provider_calls + 1;
            let diagnosis = Diagnosis::from_score(&state.best_score, step);
            let deadline = call_deadline(config, started, opts);
            state.provider_calls = step;
            tracing::debug!(step, weakest = %diagnosis.dimension, "requesting candidate");

            match self
                .propose(&state.best_text, &diagnosis, ctx, deadline, opts)
                .await
            {
                ProviderOutcome::Candidate(candidate) => {
                    if out_of_time(config, started, opts) {
                        tracing::debug!(step, "budget exhausted while waiting for candidate");
                        break StopReason::Timeout;
                    }
                    let elapsed_at_step = started.elapsed();
                    match self.evaluate(config, &state, &candidate, query, ctx) {
                        Ok((score, delta)) => {
                            tracing::info!(step, delta, total = score.total, "candidate accepted");
                            self.observer.record_event(&ObserverEvent::StepAccepted {
                                run_id,
                                step,
                                delta,
                            });
                            state.trace.push(StepRecord {
                                step_index: step,
                                proposed_score: score.total,
                                delta,
                                elapsed_at_step,
                            });
                            state.best_text = candidate;
                            state.best_score = score;
                        }
                        Err((rejection, delta)) => {
                            tracing::info!(step, delta, reason = rejection.as_str(), "candidate rejected");
                            self.observer.record_event(&ObserverEvent::CandidateRejected {
                                run_id,
                                step,
                                delta,
                                reason: rejection.as_str().to_string(),
                            });
                            break StopReason::InsufficientImprovement;
                        }
                    }
                }
                ProviderOutcome::Nothing => break StopReason::Completed,
                ProviderOutcome::Failed(err) => {
                    let timed_out = matches!(err, ProviderError::TimedOut { .. });
                    tracing::warn!(step, error = %err, "no candidate from improvement provider");
                    self.observer.record_event(&ObserverEvent::ProviderFailed {
                        run_id,
                        timed_out,
                        message: err.to_string(),
                    });
                    break if timed_out {
                        StopReason::Timeout
                    } else {
                        StopReason::Completed
                    };
                }
                ProviderOutcome::Cancelled => {
                    tracing::info!(step, "refinement cancelled by caller");
                    break StopReason::Timeout;
                }
            }
        };

        let verdict = self.filter.filter(&state.best_text, query, &ctx.locale);
        let (final_response, stop_reason) = if verdict.is_safe {
            (verdict.filtered_text.clone(), stop_reason)
        } else {
            tracing::warn!(level = %verdict.safety_level, "final response blocked by policy filter");
            (
                verdict.effective_text().to_string(),
                StopReason::PolicyResponse,
            )
        };

        let improvement_delta = state.best_score.total - original.total;
        RefinementResult {
            run_id,
            mode,
            final_response,
            original_score: Some(original),
            final_score: Some(state.best_score),
            improvement_delta,
            steps_taken: state.trace.len(),
            provider_calls: state.provider_calls,
            elapsed: started.elapsed(),
            stop_reason,
            trace: state.trace,
            verdict: Some(verdict),
        }
    }

    /// One provider call, bounded by `deadline` and the cancellation token.
    async fn propose(
        &self,
        current: &str,
        diagnosis: &Diagnosis,
        ctx: &RequestContext,
        deadline: Instant,
        opts: &EnhanceOptions,
    ) -> ProviderOutcome {
        let budget = deadline.saturating_duration_since(Instant::now());
        let call = tokio::time::timeout_at(
            deadline,
            self.provider.propose(current, diagnosis, ctx, deadline),
        );
        let cancelled = async {
            match &opts.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => ProviderOutcome::Cancelled,
            outcome = call => match outcome {
                Ok(Ok(Some(candidate))) => ProviderOutcome::Candidate(candidate),
                Ok(Ok(None)) => ProviderOutcome::Nothing,
                Ok(Err(err)) => ProviderOutcome::Failed(ProviderError::Failed(format!("{err:#}"))),
                Err(_) => ProviderOutcome::Failed(ProviderError::TimedOut {
                    budget_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                }),
            },
        }
    }

    /// Score `candidate` against the current best. `Ok` means accept.
    fn evaluate(
        &self,
        config: &EngineConfig,
        state: &LoopState,
        candidate: &str,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<(ScoreVector, f64), (Rejection, f64)> {
        if candidate.chars().count() > config.max_output_size {
            return Err((Rejection::TooLarge, 0.0));
        }
        let score = self.scorer.score(candidate, query, ctx, &config.weights);
        let delta = score.total - state.best_score.total;
        if score.safety <= 0.0 {
            return Err((Rejection::SafetyFloor, delta));
        }
        if delta < config.improvement_epsilon {
            return Err((Rejection::BelowEpsilon, delta));
        }
        Ok((score, delta))
    }
}

fn out_of_time(config: &EngineConfig, started: Instant, opts: &EnhanceOptions) -> bool {
    started.elapsed() >= config.max_latency
        || opts.deadline.is_some_and(|d| Instant::now() >= d)
        || opts.is_cancelled()
}

/// Earliest of the latency budget end and the caller's deadline.
fn call_deadline(config: &EngineConfig, started: Instant, opts: &EnhanceOptions) -> Instant {
    let budget_end = started + config.max_latency;
    opts.deadline.map_or(budget_end, |d| d.min(budget_end))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
