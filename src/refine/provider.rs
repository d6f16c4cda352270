use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::types::RequestContext;
use crate::scoring::{Dimension, ScoreVector};

/// What the provider is asked to fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Weakest dimension of the current best response.
    pub dimension: Dimension,
    pub score: f64,
    pub total: f64,
    pub suggestions: Vec<String>,
    pub penalties: Vec<String>,
    /// 1-based index of the provider call this diagnosis is for.
    pub step: usize,
}

impl Diagnosis {
    pub fn from_score(score: &ScoreVector, step: usize) -> Self {
        let dimension = score.weakest();
        Self {
            dimension,
            score: score.component(dimension),
            total: score.total,
            suggestions: score.suggestions.clone(),
            penalties: score.penalties.clone(),
            step,
        }
    }
}

/// Source of candidate revisions. Implemented outside the engine.
pub trait ImprovementProvider: Send + Sync {
    /// Provider identifier for logs.
    fn name(&self) -> &str;

    /// Propose a revision of `current` that addresses `diagnosis`, or `None`
    /// when there is nothing to offer. Must finish before `deadline`; the
    /// controller cancels the call when it does not.
    fn propose<'a>(
        &'a self,
        current: &'a str,
        diagnosis: &'a Diagnosis,
        ctx: &'a RequestContext,
        deadline: Instant,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>>;
}

/// Never proposes anything. Runs end with `completed` after one call.
pub struct NoopProvider;

impl ImprovementProvider for NoopProvider {
    fn name(&self) -> &str {
        "noop"
    }

    fn propose<'a>(
        &'a self,
        _current: &'a str,
        _diagnosis: &'a Diagnosis,
        _ctx: &'a RequestContext,
        _deadline: Instant,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>> {
        Box::pin(async { Ok(None) })
    }
}

/// Serves a fixed list of candidates in order, then `None`.
#[derive(Debug)]
pub struct ScriptedProvider {
    candidates: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: Mutex::new(candidates.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Load candidates from a JSON array of strings.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read candidates file {}", path.display()))?;
        let candidates: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a JSON array of strings", path.display()))?;
        Ok(Self::new(candidates))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ImprovementProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn propose<'a>(
        &'a self,
        _current: &'a str,
        _diagnosis: &'a Diagnosis,
        _ctx: &'a RequestContext,
        _deadline: Instant,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .candidates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front())
        })
    }
}
