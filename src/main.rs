//! topic-research: binary entrypoint.
//! Loads configuration, runs the research pipeline once and reports per-phase counts.

use std::process::ExitCode;

use topic_research::{ResearchConfig, ResearchPipeline};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status for configuration / wiring failures (before any phase ran).
const EXIT_CONFIG: u8 = 2;

/// Compact logs by default; JSON lines when RESEARCH_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("topic_research=info,warn"));

    let json = std::env::var("RESEARCH_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match ResearchConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "failed to load configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let mut pipeline = match ResearchPipeline::from_config(&cfg) {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "failed to set up pipeline");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match pipeline.run(chrono::Utc::now()).await {
        Ok(report) => {
            info!(
                fetched = report.fetched,
                failed_sources = ?report.failed_sources,
                relevant = report.relevant,
                unique = report.unique,
                duplicates = report.duplicates,
                persisted = report.persisted,
                output = %cfg.pipeline.output_path.display(),
                "research run finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(phase = %e.phase(), error = %e, "research run failed");
            ExitCode::from(e.exit_code())
        }
    }
}
