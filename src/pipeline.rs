//! # Pipeline stages
//!
//! Each stage reads the artifact of the previous one from `paths.data_dir`
//! and writes its own:
//!
//! | stage      | reads                              | writes                 |
//! |------------|------------------------------------|------------------------|
//! | `fetch`    | feeds                              | `signals.csv`          |
//! | `classify` | `signals.csv`                      | `signals_ai.csv`       |
//! | `brief`    | `signals_ai.csv` or `signals.csv`  | `briefing_<mode>.md`   |
//! | `plot`     | `signals_ai.csv` or `signals.csv`  | `tag_counts.svg`       |
//!
//! The `*_with` variants take their collaborators explicitly; the plain
//! stages build them from configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::aggregate::{select_recent, weighted_by_tag};
use crate::briefing::{compose_briefing, render_markdown, Mode};
use crate::chart::{write_bar_chart, DEFAULT_TITLE};
use crate::classify::{BatchStats, Classifier};
use crate::config::PipelineConfig;
use crate::ingest::{self, config::build_feeds, types::FeedSource, IngestReport};
use crate::llm::{build_client, DynLlmClient, LlmClient};
use crate::record::{conform_labels, SignalRecord};
use crate::store::{read_records, write_records, Schema};

/// Days covered by the chart.
pub const CHART_WINDOW_DAYS: u32 = 7;

/// Fetch the configured feeds over HTTP and write `signals.csv`.
pub async fn fetch_stage(cfg: &PipelineConfig) -> Result<IngestReport> {
    let feeds = build_feeds(&cfg.feeds)?;
    fetch_with(cfg, &feeds, Utc::now()).await
}

pub async fn fetch_with(
    cfg: &PipelineConfig,
    feeds: &[Box<dyn FeedSource>],
    now: DateTime<Utc>,
) -> Result<IngestReport> {
    let tagger = cfg.tagger()?;
    let report = ingest::run_once(feeds, &tagger, cfg.ingest.max_entries_per_feed, now).await;

    let out = cfg.paths.signals();
    write_records(&out, &report.records, Schema::Tagged)?;
    info!(
        target: "ingest",
        rows = report.records.len(),
        dropped = report.dropped,
        duplicates = report.duplicates,
        failed_feeds = report.failed_feeds.len(),
        path = %out.display(),
        "saved tagged records"
    );
    Ok(report)
}

/// Classify `signals.csv` into `signals_ai.csv`. The credential is checked
/// before the input file is touched.
pub async fn classify_stage(cfg: &PipelineConfig) -> Result<BatchStats> {
    let client = build_client(&cfg.llm)?;
    classify_with(cfg, client).await
}

pub async fn classify_with(cfg: &PipelineConfig, client: DynLlmClient) -> Result<BatchStats> {
    let input = cfg.paths.signals();
    let records = read_records(&input)?;

    let classifier = Classifier::new(client, cfg.label_set(), &cfg.classifier);
    let (records, stats) = classifier.classify_batch(records).await;

    let out = cfg.paths.signals_ai();
    write_records(&out, &records, Schema::Classified)?;
    info!(target: "classify", rows = records.len(), path = %out.display(), "saved classified records");
    Ok(stats)
}

/// Compose and write the briefing for `mode`. `Ok(None)` when the window
/// holds no records; no document is written then.
pub async fn brief_stage(cfg: &PipelineConfig, mode: Mode) -> Result<Option<PathBuf>> {
    let client = build_client(&cfg.llm)?;
    brief_with(cfg, mode, client.as_ref()).await
}

pub async fn brief_with(
    cfg: &PipelineConfig,
    mode: Mode,
    client: &dyn LlmClient,
) -> Result<Option<PathBuf>> {
    let input = cfg.paths.briefing_input();
    let records = read_aggregation_input(cfg, &input)?;

    let Some(briefing) = compose_briefing(&records, mode, client, &cfg.briefing).await else {
        info!(target: "briefing", mode = mode.as_str(), path = %input.display(), "no recent data; nothing to brief");
        return Ok(None);
    };

    let out = cfg.paths.briefing(mode);
    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(&out, render_markdown(&briefing))
        .with_context(|| format!("writing briefing {}", out.display()))?;
    info!(target: "briefing", mode = mode.as_str(), path = %out.display(), "saved briefing");
    Ok(Some(out))
}

/// Weighted tag counts of the last week as `tag_counts.svg`.
pub fn plot_stage(cfg: &PipelineConfig) -> Result<PathBuf> {
    let records = read_aggregation_input(cfg, &cfg.paths.briefing_input())?;
    let recent = select_recent(&records, CHART_WINDOW_DAYS, None);
    let totals = weighted_by_tag(&recent, &cfg.weights);

    let out = cfg.paths.chart();
    write_bar_chart(&out, &totals, DEFAULT_TITLE)?;
    info!(bars = totals.len(), path = %out.display(), "saved chart");
    Ok(out)
}

/// Stored records with labels outside the configured set folded into `other`.
fn read_aggregation_input(cfg: &PipelineConfig, path: &Path) -> Result<Vec<SignalRecord>> {
    Ok(conform_labels(read_records(path)?, &cfg.label_set()))
}

/// fetch → classify → daily and weekly briefings → chart. The credential is
/// resolved first so nothing is fetched without it.
pub async fn run_all(cfg: &PipelineConfig) -> Result<()> {
    let client = build_client(&cfg.llm)?;
    fetch_stage(cfg).await?;
    run_after_fetch(cfg, client).await
}

/// Every stage after fetch, sharing one client.
pub async fn run_after_fetch(cfg: &PipelineConfig, client: DynLlmClient) -> Result<()> {
    classify_with(cfg, client.clone()).await?;
    for mode in [Mode::Daily, Mode::Weekly] {
        brief_with(cfg, mode, client.as_ref()).await?;
    }
    plot_stage(cfg)?;
    Ok(())
}
