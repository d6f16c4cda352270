use super::{Mode, RefineConfig};

impl RefineConfig {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var("IRIS_REFINE_MODE")
            && let Ok(mode) = mode.trim().parse::<Mode>()
        {
            self.default_mode = mode;
        }

        if let Ok(catalog) = std::env::var("IRIS_REFINE_CATALOG")
            && !catalog.trim().is_empty()
        {
            self.policy.catalog_path = Some(catalog);
        }

        if let Ok(locale) = std::env::var("IRIS_REFINE_LOCALE")
            && !locale.trim().is_empty()
        {
            self.policy.default_locale = crate::policy::normalise_locale(locale.trim());
        }

        if let Ok(backend) = std::env::var("IRIS_REFINE_OBSERVABILITY")
            && !backend.trim().is_empty()
        {
            self.observability.backend = backend.trim().to_lowercase();
        }
    }
}
