use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::error::ConfigError;
use crate::scoring::Dimension;

// ── Mode ─────────────────────────────────────────────────────────────

/// Refinement depth preset. Presets differ only in their budgets and epsilon.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    Fast,
    #[default]
    Normal,
    Deep,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Fast, Mode::Normal, Mode::Deep];
}

// ── Top-level config ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Resolved at load time, never persisted.
    #[serde(skip)]
    pub config_path: PathBuf,
    #[serde(default)]
    pub default_mode: Mode,
    #[serde(default)]
    pub modes: ModesConfig,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            default_mode: Mode::default(),
            modes: ModesConfig::default(),
            weights: ScoringWeights::default(),
            scorer: ScorerConfig::default(),
            policy: PolicyConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

// ── Modes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub max_steps: u32,
    pub max_latency_ms: u64,
    pub max_output_size: usize,
    pub improvement_epsilon: f64,
    pub tool_call_cap: u32,
}

impl ModeConfig {
    pub fn fast() -> Self {
        Self {
            max_steps: 2,
            max_latency_ms: 2_000,
            max_output_size: 2_000,
            improvement_epsilon: 0.05,
            tool_call_cap: 2,
        }
    }

    pub fn normal() -> Self {
        Self {
            max_steps: 3,
            max_latency_ms: 5_000,
            max_output_size: 4_000,
            improvement_epsilon: 0.03,
            tool_call_cap: 3,
        }
    }

    pub fn deep() -> Self {
        Self {
            max_steps: 5,
            max_latency_ms: 12_000,
            max_output_size: 8_000,
            improvement_epsilon: 0.01,
            tool_call_cap: 5,
        }
    }

    fn validate(&self, mode: Mode) -> Result<(), ConfigError> {
        if !self.improvement_epsilon.is_finite() || self.improvement_epsilon < 0.0 {
            return Err(ConfigError::Validation(format!(
                "modes.{mode}.improvement_epsilon must be a finite value >= 0"
            )));
        }
        if self.max_latency_ms == 0 {
            return Err(ConfigError::Validation(format!(
                "modes.{mode}.max_latency_ms must be > 0"
            )));
        }
        if self.max_output_size == 0 {
            return Err(ConfigError::Validation(format!(
                "modes.{mode}.max_output_size must be > 0"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModesConfig {
    #[serde(default = "ModeConfig::fast")]
    pub fast: ModeConfig,
    #[serde(default = "ModeConfig::normal")]
    pub normal: ModeConfig,
    #[serde(default = "ModeConfig::deep")]
    pub deep: ModeConfig,
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            fast: ModeConfig::fast(),
            normal: ModeConfig::normal(),
            deep: ModeConfig::deep(),
        }
    }
}

impl ModesConfig {
    pub fn get(&self, mode: Mode) -> &ModeConfig {
        match mode {
            Mode::Fast => &self.fast,
            Mode::Normal => &self.normal,
            Mode::Deep => &self.deep,
        }
    }
}

// ── Weights ──────────────────────────────────────────────────────────

/// Per-dimension weights. Need not sum to 1; normalized at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_relevance_weight")]
    pub relevance: f64,
    #[serde(default = "default_safety_weight")]
    pub safety: f64,
    #[serde(default = "default_clarity_weight")]
    pub clarity: f64,
    #[serde(default = "default_brevity_weight")]
    pub brevity: f64,
    #[serde(default = "default_helpfulness_weight")]
    pub helpfulness: f64,
}

fn default_relevance_weight() -> f64 {
    0.30
}
fn default_safety_weight() -> f64 {
    0.25
}
fn default_clarity_weight() -> f64 {
    0.15
}
fn default_brevity_weight() -> f64 {
    0.10
}
fn default_helpfulness_weight() -> f64 {
    0.20
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            relevance: default_relevance_weight(),
            safety: default_safety_weight(),
            clarity: default_clarity_weight(),
            brevity: default_brevity_weight(),
            helpfulness: default_helpfulness_weight(),
        }
    }
}

impl ScoringWeights {
    pub fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Relevance => self.relevance,
            Dimension::Safety => self.safety,
            Dimension::Clarity => self.clarity,
            Dimension::Brevity => self.brevity,
            Dimension::Helpfulness => self.helpfulness,
        }
    }

    pub fn sum(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.weight(*d)).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for dimension in Dimension::ALL {
            let w = self.weight(dimension);
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "weights.{dimension} must be a finite value >= 0 (got {w})"
                )));
            }
        }
        if self.sum() <= 0.0 {
            return Err(ConfigError::Validation(
                "at least one scoring weight must be > 0".into(),
            ));
        }
        if self.safety <= 0.0 {
            return Err(ConfigError::Validation(
                "weights.safety must be > 0 so the safety floor can block candidates".into(),
            ));
        }
        Ok(())
    }
}

// ── Scorer / policy / observability ──────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    #[serde(default = "default_max_mean_sentence_words")]
    pub max_mean_sentence_words: usize,
    #[serde(default = "default_max_scan_bytes")]
    pub max_scan_bytes: usize,
}

fn default_max_mean_sentence_words() -> usize {
    25
}
fn default_max_scan_bytes() -> usize {
    256 * 1024
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            max_mean_sentence_words: default_max_mean_sentence_words(),
            max_scan_bytes: default_max_scan_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// External catalog file; the built-in catalog is used when unset.
    #[serde(default)]
    pub catalog_path: Option<String>,
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

fn default_locale() -> String {
    "en".into()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            default_locale: default_locale(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "log" | "none"
    #[serde(default = "default_observability_backend")]
    pub backend: String,
}

fn default_observability_backend() -> String {
    "log".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: default_observability_backend(),
        }
    }
}

// ── Resolved per-mode engine config ──────────────────────────────────

/// Immutable budget and weighting for one mode. Built once, shared by reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub mode: Mode,
    pub max_steps: u32,
    pub max_latency: Duration,
    pub max_output_size: usize,
    pub improvement_epsilon: f64,
    pub tool_call_cap: u32,
    pub weights: ScoringWeights,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        if !self.improvement_epsilon.is_finite() || self.improvement_epsilon < 0.0 {
            return Err(ConfigError::Validation(
                "improvement_epsilon must be a finite value >= 0".into(),
            ));
        }
        if self.max_latency.is_zero() {
            return Err(ConfigError::Validation("max_latency must be > 0".into()));
        }
        Ok(())
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        for mode in Mode::ALL {
            self.modes.get(mode).validate(mode)?;
        }
        if self.scorer.max_scan_bytes == 0 {
            return Err(ConfigError::Validation(
                "scorer.max_scan_bytes must be > 0".into(),
            ));
        }
        if self.policy.default_locale.trim().is_empty() {
            return Err(ConfigError::Validation(
                "policy.default_locale must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn engine_config(&self, mode: Mode) -> EngineConfig {
        let preset = self.modes.get(mode);
        EngineConfig {
            mode,
            max_steps: preset.max_steps,
            max_latency: Duration::from_millis(preset.max_latency_ms),
            max_output_size: preset.max_output_size,
            improvement_epsilon: preset.improvement_epsilon,
            tool_call_cap: preset.tool_call_cap,
            weights: self.weights,
        }
    }
}
