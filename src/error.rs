use thiserror::Error;

use crate::scoring::Dimension;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `iris-refine`.
///
/// Each subsystem defines its own error variant. None of these ever reach the
/// caller of [`crate::refine::ReflectionController::enhance`]: the controller
/// converts them into a degraded-but-valid result. They are public so that
/// configuration and catalog loading can report precise failures at startup.
#[derive(Debug, Error)]
pub enum RefineError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Pattern catalog ─────────────────────────────────────────────────
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    // ── Scoring ─────────────────────────────────────────────────────────
    #[error("scoring: {0}")]
    Scoring(#[from] ScoringError),

    // ── Policy filter ───────────────────────────────────────────────────
    #[error("filter: {0}")]
    Filter(#[from] FilterError),

    // ── Improvement provider ────────────────────────────────────────────
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Catalog errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("pattern {name} does not compile: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("catalog has no default reply for locale {locale}")]
    MissingDefaultReply { locale: String },

    #[error("placeholder {placeholder} is matched by the catalog itself")]
    SelfMatchingPlaceholder { placeholder: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Scoring errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("input of {size} bytes exceeds scan limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("{0} heuristic panicked")]
    Panicked(Dimension),
}

// ─── Filter errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("input of {size} bytes exceeds scan limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("filter panicked: {0}")]
    Panicked(String),

    #[error("redacted text still matched after {passes} passes")]
    UnstableRedaction { passes: usize },
}

// ─── Provider errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("improvement provider failed: {0}")]
    Failed(String),

    #[error("improvement provider exceeded its {budget_ms}ms budget")]
    TimedOut { budget_ms: u64 },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, RefineError>;
