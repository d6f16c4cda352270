#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod policy;
pub mod refine;
pub mod scoring;

pub use catalog::{PatternCatalog, PolicyCategory};
pub use config::{EngineConfig, Mode, RefineConfig};
pub use error::{RefineError, Result};
pub use policy::{FilterVerdict, PolicyFilter, SafetyLevel};
pub use refine::{
    EnhanceOptions, ImprovementProvider, RefinementResult, ReflectionController, RequestContext,
    StopReason,
};
pub use scoring::{Dimension, FeatureScorer, ResponseScorer, ScoreVector};
