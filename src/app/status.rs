use crate::catalog::PatternCatalog;
use crate::config::{Mode, RefineConfig};

pub fn render_status(config: &RefineConfig, catalog: &PatternCatalog) -> String {
    let catalog_source = config
        .catalog_path()
        .map_or_else(|| "(built-in)".to_string(), |p| p.display().to_string());

    let mut lines = vec![
        "◆ iris-refine status".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", config.config_path.display()),
        format!("Mode        {}", config.default_mode),
        format!("Observer    {}", config.observability.backend),
        String::new(),
        format!("Catalog     {catalog_source}"),
        format!("  version     {}", catalog.version()),
        format!("  fingerprint {}", catalog.fingerprint()),
        format!("  locale      {}", config.policy.default_locale),
        format!("  scan limit  {} bytes", catalog.max_scan_bytes()),
        String::new(),
        "Budgets".to_string(),
    ];

    for mode in Mode::ALL {
        let engine = config.engine_config(mode);
        lines.push(format!(
            "  {:<6} steps={} latency={}ms output={} chars epsilon={} calls={}",
            mode.to_string(),
            engine.max_steps,
            engine.max_latency.as_millis(),
            engine.max_output_size,
            engine.improvement_epsilon,
            engine.tool_call_cap,
        ));
    }

    let w = &config.weights;
    lines.push(String::new());
    lines.push(format!(
        "Weights     relevance={} safety={} clarity={} brevity={} helpfulness={}",
        w.relevance, w.safety, w.clarity, w.brevity, w.helpfulness
    ));
    lines.join("\n")
}
