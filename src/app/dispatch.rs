use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::app::status::render_status;
use crate::catalog::PatternCatalog;
use crate::cli::{Cli, Commands};
use crate::config::RefineConfig;
use crate::policy::PolicyFilter;
use crate::refine::{
    ImprovementProvider, NoopProvider, ReflectionController, RequestContext, ScriptedProvider,
};
use crate::scoring::FeatureScorer;

fn load_catalog(config: &RefineConfig) -> Result<Arc<PatternCatalog>> {
    Ok(Arc::new(PatternCatalog::from_config(config)?))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output")
}

/// Execute one CLI command and return what should be printed.
pub async fn run_command(cli: Cli, config: RefineConfig) -> Result<String> {
    match cli.command {
        Commands::Engage { query } => {
            let catalog = load_catalog(&config)?;
            Ok(crate::refine::should_engage(&query, &catalog).to_string())
        }

        Commands::Score { query, response } => {
            let catalog = load_catalog(&config)?;
            let scorer = FeatureScorer::new(catalog, config.scorer.clone());
            let ctx = RequestContext::new(query.clone());
            let score = scorer.score(&response, &query, &ctx, &config.weights);
            to_json(&score)
        }

        Commands::Filter {
            query,
            text,
            locale,
        } => {
            let catalog = load_catalog(&config)?;
            let filter = PolicyFilter::new(catalog, &config.policy.default_locale);
            let verdict = filter.filter(&text, &query, locale.as_deref().unwrap_or_default());
            to_json(&verdict)
        }

        Commands::Enhance {
            query,
            response,
            mode,
            candidates,
            locale,
        } => {
            let provider: Arc<dyn ImprovementProvider> = match candidates {
                Some(path) => Arc::new(ScriptedProvider::from_json_file(&path)?),
                None => Arc::new(NoopProvider),
            };
            let controller = ReflectionController::from_config(&config, provider)?;
            let mode = mode.unwrap_or(config.default_mode);
            let mut ctx = RequestContext::new(query.clone());
            if let Some(locale) = locale {
                ctx = ctx.with_locale(locale);
            }

            info!(mode = %mode, "enhancing response");
            let result = controller.enhance(&response, &query, &ctx, mode).await;
            to_json(&result)
        }

        Commands::Config => config.to_toml_string(),

        Commands::Status => {
            let catalog = load_catalog(&config)?;
            Ok(render_status(&config, &catalog))
        }
    }
}

pub async fn dispatch(cli: Cli, config: RefineConfig) -> Result<()> {
    let output = run_command(cli, config).await?;
    println!("{output}");
    Ok(())
}
