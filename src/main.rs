use anyhow::{Context, Result};
use chrono::Utc;
use griddash::{
    config::{Config, DEFAULT_CONFIG_PATH},
    fetch::{parse_base, Loader},
    pipeline::{self, RegionSummary},
    render::render_page,
};
use reqwest::Client;
use std::{env, fs, time::Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(log_level.parse().unwrap_or(Level::INFO.into()))
    });
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load(&config_path)?;

    let mut builder = Client::builder();
    if let Some(timeout) = cfg.request_timeout() {
        builder = builder.timeout(timeout);
    }
    let client = builder.build().context("building HTTP client")?;
    let base = parse_base(&cfg.base_url)?;
    info!(base = %base, sources = cfg.sources.len(), "loading sources");
    let loader = Loader::new(client, base);

    // ─── 3) load + parse every source concurrently ───────────────────
    let start = Instant::now();
    let outcomes = pipeline::run_all(&loader, &cfg.sources).await;
    let failed = outcomes
        .iter()
        .filter(|o| o.failure_message().is_some())
        .count();
    info!(elapsed = ?start.elapsed(), failed, "sources processed");

    // ─── 4) write page + render targets ──────────────────────────────
    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating {}", cfg.output_dir.display()))?;

    let html = render_page("Microgrid Dispatch Results", &cfg.sources, &outcomes, Utc::now())?;
    let page_path = cfg.output_dir.join("index.html");
    fs::write(&page_path, html).with_context(|| format!("writing {}", page_path.display()))?;

    let summaries: Vec<RegionSummary> = cfg
        .sources
        .iter()
        .zip(&outcomes)
        .map(|(s, o)| o.summary(s))
        .collect();
    let json_path = cfg.output_dir.join("targets.json");
    fs::write(&json_path, serde_json::to_string_pretty(&summaries)?)
        .with_context(|| format!("writing {}", json_path.display()))?;

    if failed > 0 {
        warn!(failed, "some tables show an error message instead of data");
    }
    info!(page = %page_path.display(), json = %json_path.display(), "all done");
    Ok(())
}
