//! Bounded refinement loop: engagement gate, improvement-provider seam,
//! controller and aggregate performance counters.

mod controller;
mod engage;
pub mod provider;
mod stats;
pub mod types;

pub use crate::config::Mode;
pub use controller::ReflectionController;
pub use engage::should_engage;
pub use provider::{Diagnosis, ImprovementProvider, NoopProvider, ScriptedProvider};
pub use stats::PerformanceStats;
pub use types::{
    EnhanceOptions, RefinementResult, RequestContext, Role, StepRecord, StopReason, Turn,
};
