// =============================================================================
// chart-indicators — command-line entry point
// =============================================================================
//
// Loads a bar series from JSON, restores the saved indicator layout (or the
// configured defaults on a fresh chart), computes every indicator, prints
// each one's latest legend line and saves the layout back.
//
//   chart-indicators [bars.json]
//
// The bars path falls back to CHART_BARS; the config path is CHART_CONFIG
// (default `chart_config.json`).
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use chart_indicators::{Bar, FileStorage, IndicatorManager, IndicatorStore, RuntimeConfig};

fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bars from {}", path.display()))?;
    let bars: Vec<Bar> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse bars from {}", path.display()))?;
    Ok(bars)
}

fn format_time(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("CHART_CONFIG").unwrap_or_else(|_| "chart_config.json".to_string());
    let config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    let bars_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CHART_BARS").ok())
        .context("no bar file given (pass a path or set CHART_BARS)")?;

    // ── 2. Bars ──────────────────────────────────────────────────────────
    let bars = load_bars(Path::new(&bars_path))?;
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => info!(
            bars = bars.len(),
            from = %format_time(first.time),
            to = %format_time(last.time),
            "Bars loaded"
        ),
        _ => warn!(path = %bars_path, "Bar file is empty"),
    }

    // ── 3. Indicators ────────────────────────────────────────────────────
    let store = IndicatorStore::new(FileStorage::new(&config.storage_dir), &config.storage_key);
    let mut manager = IndicatorManager::new();
    manager.set_listener(|event| debug!(?event, "indicator event"));

    if store.restore(&mut manager) == 0 {
        for type_id in &config.default_indicators {
            manager.add_indicator(config.build_indicator(*type_id))?;
        }
        info!(indicators = manager.len(), "Fresh chart, default indicators added");
    }

    manager.set_data(bars);

    for indicator in manager.iter() {
        let range = indicator.range();
        info!(
            id = %indicator.id(),
            kind = %indicator.kind(),
            min = range.min,
            max = range.max,
            "{}",
            indicator.description(None)
        );
    }

    // ── 4. Save layout ───────────────────────────────────────────────────
    store.persist(&manager)?;
    Ok(())
}
