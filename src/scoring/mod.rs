//! Heuristic multi-dimensional quality scoring.
//!
//! [`FeatureScorer`] rates a candidate response on five independent
//! dimensions and combines them with configured weights into a
//! [`ScoreVector`]. Scoring never fails from the caller's point of view: a
//! failing heuristic degrades to a neutral vector tagged `scoring_failed`.

mod brevity;
mod clarity;
mod helpfulness;
mod relevance;
mod safety;
mod text;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::catalog::PatternCatalog;
use crate::config::{ScorerConfig, ScoringWeights};
use crate::error::ScoringError;
use crate::refine::RequestContext;

const NEUTRAL_SCORE: f64 = 0.5;

/// One of the five quality dimensions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Dimension {
    Relevance,
    Safety,
    Clarity,
    Brevity,
    Helpfulness,
}

impl Dimension {
    /// All dimensions in tie-break order for weakest-dimension diagnosis.
    pub const ALL: [Dimension; 5] = [
        Dimension::Relevance,
        Dimension::Safety,
        Dimension::Clarity,
        Dimension::Brevity,
        Dimension::Helpfulness,
    ];
}

/// Output of a single dimension heuristic before weighting.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DimensionScore {
    pub value: f64,
    pub penalties: Vec<String>,
    pub suggestions: Vec<String>,
}

impl DimensionScore {
    pub(crate) fn new(value: f64) -> Self {
        Self {
            value,
            penalties: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub(crate) fn penalty(&mut self, tag: impl Into<String>) {
        self.penalties.push(tag.into());
    }

    pub(crate) fn suggest(&mut self, tag: impl Into<String>) {
        self.suggestions.push(tag.into());
    }

    fn clamped(&self) -> f64 {
        clamp_unit(self.value)
    }
}

/// Five component scores, their weighted total, and advisory tags.
///
/// Built once per scored candidate and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    pub relevance: f64,
    pub safety: f64,
    pub clarity: f64,
    pub brevity: f64,
    pub helpfulness: f64,
    pub total: f64,
    pub penalties: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ScoreVector {
    /// Combine component scores with `weights`.
    ///
    /// `suggestions` always leads with `improve_<weakest>`, followed by the
    /// per-dimension suggestions (deduplicated, in first-seen order).
    /// Penalties and suggestions never influence `total`.
    pub fn from_components(
        components: [f64; 5],
        weights: &ScoringWeights,
        penalties: Vec<String>,
        extra_suggestions: Vec<String>,
    ) -> Self {
        let [relevance, safety, clarity, brevity, helpfulness] = components.map(clamp_unit);
        let mut vector = Self {
            relevance,
            safety,
            clarity,
            brevity,
            helpfulness,
            total: 0.0,
            penalties: dedup(penalties),
            suggestions: Vec::new(),
        };
        vector.total = vector.weighted_total(weights);

        let mut suggestions = vec![format!("improve_{}", vector.weakest())];
        suggestions.extend(extra_suggestions);
        vector.suggestions = dedup(suggestions);
        vector
    }

    /// All dimensions at 0.5 with penalty `scoring_failed`. With
    /// `safety_floor` set, safety stays at 0.0.
    pub fn neutral(weights: &ScoringWeights, safety_floor: bool) -> Self {
        let safety = if safety_floor { 0.0 } else { NEUTRAL_SCORE };
        Self::from_components(
            [NEUTRAL_SCORE, safety, NEUTRAL_SCORE, NEUTRAL_SCORE, NEUTRAL_SCORE],
            weights,
            vec!["scoring_failed".to_string()],
            Vec::new(),
        )
    }

    pub fn component(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Relevance => self.relevance,
            Dimension::Safety => self.safety,
            Dimension::Clarity => self.clarity,
            Dimension::Brevity => self.brevity,
            Dimension::Helpfulness => self.helpfulness,
        }
    }

    /// Lowest-scoring dimension; ties go to the earlier entry of [`Dimension::ALL`].
    pub fn weakest(&self) -> Dimension {
        let mut weakest = Dimension::Relevance;
        for dimension in Dimension::ALL {
            if self.component(dimension) < self.component(weakest) {
                weakest = dimension;
            }
        }
        weakest
    }

    fn weighted_total(&self, weights: &ScoringWeights) -> f64 {
        let sum = weights.sum();
        if sum <= 0.0 || !sum.is_finite() {
            return 0.0;
        }
        let weighted: f64 = Dimension::ALL
            .iter()
            .map(|d| weights.weight(*d) * self.component(*d))
            .sum();
        clamp_unit(weighted / sum)
    }
}

/// Scoring seam used by the controller.
pub trait ResponseScorer: Send + Sync {
    fn score(
        &self,
        text: &str,
        query: &str,
        ctx: &RequestContext,
        weights: &ScoringWeights,
    ) -> ScoreVector;
}

/// The built-in heuristic scorer.
pub struct FeatureScorer {
    catalog: Arc<PatternCatalog>,
    config: ScorerConfig,
}

impl FeatureScorer {
    pub fn new(catalog: Arc<PatternCatalog>, config: ScorerConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Score `text`, substituting a neutral vector when a heuristic fails.
    pub fn score(
        &self,
        text: &str,
        query: &str,
        ctx: &RequestContext,
        weights: &ScoringWeights,
    ) -> ScoreVector {
        let mut safety_floor = false;
        match self.score_guarded(text, query, ctx, weights, &mut safety_floor) {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!(error = %err, safety_floor, "scoring failed, using neutral score vector");
                ScoreVector::neutral(weights, safety_floor)
            }
        }
    }

    /// Score `text`, surfacing heuristic failures to the caller.
    pub fn try_score(
        &self,
        text: &str,
        query: &str,
        ctx: &RequestContext,
        weights: &ScoringWeights,
    ) -> Result<ScoreVector, ScoringError> {
        let mut safety_floor = false;
        self.score_guarded(text, query, ctx, weights, &mut safety_floor)
    }

    fn score_guarded(
        &self,
        text: &str,
        query: &str,
        ctx: &RequestContext,
        weights: &ScoringWeights,
        safety_floor: &mut bool,
    ) -> Result<ScoreVector, ScoringError> {
        let limit = self.config.max_scan_bytes;
        let size = text.len().max(query.len());
        if size > limit {
            // Too large to score, but a restricted token in the scannable
            // prefix still pins safety at zero.
            let prefix = &text[..floor_char_boundary(text, limit)];
            *safety_floor = self.catalog.scan(prefix).has_restricted();
            return Err(ScoringError::InputTooLarge { size, limit });
        }

        // Safety runs first so a restricted match survives a later failure.
        let safety = guard(Dimension::Safety, || safety::score(text, &self.catalog))?;
        *safety_floor = safety.clamped() <= 0.0;

        let relevance = guard(Dimension::Relevance, || relevance::score(text, query, ctx))?;
        let clarity = guard(Dimension::Clarity, || {
            clarity::score(text, self.config.max_mean_sentence_words)
        })?;
        let brevity = guard(Dimension::Brevity, || brevity::score(text, query, ctx))?;
        let helpfulness = guard(Dimension::Helpfulness, || helpfulness::score(text))?;

        let parts = [relevance, safety, clarity, brevity, helpfulness];
        let components = [
            parts[0].clamped(),
            parts[1].clamped(),
            parts[2].clamped(),
            parts[3].clamped(),
            parts[4].clamped(),
        ];
        let mut penalties = Vec::new();
        let mut suggestions = Vec::new();
        for part in parts {
            penalties.extend(part.penalties);
            suggestions.extend(part.suggestions);
        }
        Ok(ScoreVector::from_components(
            components,
            weights,
            penalties,
            suggestions,
        ))
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    (0..=index)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0)
}

impl ResponseScorer for FeatureScorer {
    fn score(
        &self,
        text: &str,
        query: &str,
        ctx: &RequestContext,
        weights: &ScoringWeights,
    ) -> ScoreVector {
        FeatureScorer::score(self, text, query, ctx, weights)
    }
}

fn guard<F>(dimension: Dimension, heuristic: F) -> Result<DimensionScore, ScoringError>
where
    F: FnOnce() -> DimensionScore,
{
    catch_unwind(AssertUnwindSafe(heuristic)).map_err(|_| ScoringError::Panicked(dimension))
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn dedup(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
