mod env_overrides;
mod loader;
pub mod schema;

pub use schema::{
    EngineConfig, Mode, ModeConfig, ModesConfig, ObservabilityConfig, PolicyConfig, RefineConfig,
    ScorerConfig, ScoringWeights,
};
