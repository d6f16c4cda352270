#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use iris_refine::config::ScoringWeights;
use iris_refine::observability::{Observer, ObserverEvent, ObserverMetric, NoopObserver};
use iris_refine::refine::Diagnosis;
use iris_refine::{
    ImprovementProvider, PatternCatalog, PolicyFilter, RefineConfig, ReflectionController,
    RequestContext, ResponseScorer, ScoreVector,
};

pub type ProposeFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>>;

/// Scores texts from a fixed table; unknown texts get `fallback`.
pub struct TableScorer {
    totals: HashMap<String, f64>,
    unsafe_texts: Vec<String>,
    fallback: f64,
}

impl TableScorer {
    pub fn new(entries: &[(&str, f64)]) -> Self {
        Self {
            totals: entries
                .iter()
                .map(|(text, total)| ((*text).to_string(), *total))
                .collect(),
            unsafe_texts: Vec::new(),
            fallback: 0.5,
        }
    }

    /// Texts that should come back with `safety == 0.0`.
    pub fn with_unsafe(mut self, text: &str) -> Self {
        self.unsafe_texts.push(text.to_string());
        self
    }
}

impl ResponseScorer for TableScorer {
    fn score(
        &self,
        text: &str,
        _query: &str,
        _ctx: &RequestContext,
        _weights: &ScoringWeights,
    ) -> ScoreVector {
        let total = self.totals.get(text).copied().unwrap_or(self.fallback);
        let safety = if self.unsafe_texts.iter().any(|t| t == text) {
            0.0
        } else {
            1.0
        };
        ScoreVector {
            relevance: total,
            safety,
            clarity: total,
            brevity: total,
            helpfulness: total,
            total,
            penalties: Vec::new(),
            suggestions: vec!["improve_relevance".to_string()],
        }
    }
}

/// Sleeps for `delay`, then proposes `candidate`.
pub struct SlowProvider {
    pub delay: Duration,
    pub candidate: String,
}

impl ImprovementProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    fn propose<'a>(
        &'a self,
        _current: &'a str,
        _diagnosis: &'a Diagnosis,
        _ctx: &'a RequestContext,
        _deadline: Instant,
    ) -> ProposeFuture<'a> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(Some(self.candidate.clone()))
        })
    }
}

pub struct PanickingProvider;

fn explode() -> anyhow::Result<Option<String>> {
    panic!("provider exploded")
}

impl ImprovementProvider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking"
    }

    fn propose<'a>(
        &'a self,
        _current: &'a str,
        _diagnosis: &'a Diagnosis,
        _ctx: &'a RequestContext,
        _deadline: Instant,
    ) -> ProposeFuture<'a> {
        Box::pin(async { explode() })
    }
}

pub struct FailingProvider;

impl ImprovementProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn propose<'a>(
        &'a self,
        _current: &'a str,
        _diagnosis: &'a Diagnosis,
        _ctx: &'a RequestContext,
        _deadline: Instant,
    ) -> ProposeFuture<'a> {
        Box::pin(async { Err(anyhow::anyhow!("upstream returned 503")) })
    }
}

/// Proposes `prefix-<n>` forever and records every diagnosis it receives.
pub struct CountingProvider {
    prefix: String,
    calls: AtomicUsize,
    diagnoses: Mutex<Vec<Diagnosis>>,
}

impl CountingProvider {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            calls: AtomicUsize::new(0),
            diagnoses: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn diagnoses(&self) -> Vec<Diagnosis> {
        self.diagnoses.lock().unwrap().clone()
    }
}

impl ImprovementProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn propose<'a>(
        &'a self,
        _current: &'a str,
        diagnosis: &'a Diagnosis,
        _ctx: &'a RequestContext,
        _deadline: Instant,
    ) -> ProposeFuture<'a> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.diagnoses.lock().unwrap().push(diagnosis.clone());
            Ok(Some(format!("{}-{n}", self.prefix)))
        })
    }
}

/// Keeps every event for later inspection.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
    metrics: Mutex<Vec<ObserverMetric>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn metrics(&self) -> Vec<ObserverMetric> {
        self.metrics.lock().unwrap().clone()
    }
}

impl Observer for RecordingObserver {
    fn record_event(&self, event: &ObserverEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        self.metrics.lock().unwrap().push(metric.clone());
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn builtin_catalog() -> Arc<PatternCatalog> {
    Arc::new(PatternCatalog::builtin().expect("built-in catalog should load"))
}

/// Controller over the built-in catalog with a custom scorer and provider.
pub fn controller_with(
    config: &RefineConfig,
    scorer: Arc<dyn ResponseScorer>,
    provider: Arc<dyn ImprovementProvider>,
) -> ReflectionController {
    controller_observed(config, scorer, provider, Arc::new(NoopObserver))
}

pub fn controller_observed(
    config: &RefineConfig,
    scorer: Arc<dyn ResponseScorer>,
    provider: Arc<dyn ImprovementProvider>,
    observer: Arc<dyn Observer>,
) -> ReflectionController {
    let filter = Arc::new(PolicyFilter::new(
        builtin_catalog(),
        &config.policy.default_locale,
    ));
    ReflectionController::new(config, scorer, filter, provider, observer)
        .expect("controller config should be valid")
}

pub fn ctx(query: &str) -> RequestContext {
    RequestContext::new(query)
}
