// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use crate::ingest::types::{FeedSource, RawEntry};
use crate::record::{parse_timestamp, SignalRecord};
use crate::tagger::KeywordTagger;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_entries_total", "Entries read from feeds.");
        describe_counter!(
            "ingest_dropped_total",
            "Entries dropped for a blank title or link."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Entries removed as (title, url) duplicates."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Feed fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// `published`, then `updated`, else the ingestion time.
pub fn entry_timestamp(entry: &RawEntry, now: DateTime<Utc>) -> DateTime<Utc> {
    [entry.published.as_deref(), entry.updated.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_timestamp)
        .unwrap_or(now)
}

/// Turn one feed's entries into tagged records.
///
/// Only the first `max_entries` entries are considered; entries with a blank
/// title or link are dropped. Returns `(records, dropped)`.
pub fn records_from_entries(
    source: &str,
    entries: Vec<RawEntry>,
    max_entries: usize,
    tagger: &KeywordTagger,
    now: DateTime<Utc>,
) -> (Vec<SignalRecord>, usize) {
    let mut dropped = 0usize;
    let mut out = Vec::with_capacity(entries.len().min(max_entries));
    for entry in entries.into_iter().take(max_entries) {
        let title = normalize_text(entry.title.as_deref().unwrap_or_default());
        let link = entry.link.as_deref().unwrap_or_default().trim().to_string();
        if title.is_empty() || link.is_empty() {
            dropped += 1;
            continue;
        }
        let ts = entry_timestamp(&entry, now);
        let tag = tagger.tag(&title);
        out.push(SignalRecord::tagged(ts, source, title, link, tag));
    }
    (out, dropped)
}

/// Drop later duplicates of `(title, url)`, then order newest first.
/// Returns `(records, duplicates_removed)`.
pub fn dedup_and_sort(records: Vec<SignalRecord>) -> (Vec<SignalRecord>, usize) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut keep = Vec::with_capacity(records.len());
    let mut dups = 0usize;
    for r in records {
        if !seen.insert((r.title.clone(), r.url.clone())) {
            dups += 1;
            continue;
        }
        keep.push(r);
    }
    keep.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    (keep, dups)
}

/// Outcome of one ingest pass.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub records: Vec<SignalRecord>,
    pub dropped: usize,
    pub duplicates: usize,
    pub failed_feeds: Vec<String>,
}

/// Fetch every feed once, sequentially. A failing feed is logged and
/// skipped; the others still contribute.
pub async fn run_once(
    feeds: &[Box<dyn FeedSource>],
    tagger: &KeywordTagger,
    max_entries_per_feed: usize,
    now: DateTime<Utc>,
) -> IngestReport {
    ensure_metrics_described();

    let mut report = IngestReport::default();
    let mut all = Vec::new();
    for feed in feeds {
        match feed.fetch_entries().await {
            Ok(entries) => {
                counter!("ingest_entries_total").increment(entries.len() as u64);
                let (mut recs, dropped) =
                    records_from_entries(feed.name(), entries, max_entries_per_feed, tagger, now);
                tracing::info!(target: "ingest", feed = feed.name(), kept = recs.len(), dropped, "feed read");
                report.dropped += dropped;
                all.append(&mut recs);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, feed = feed.name(), "feed error");
                counter!("ingest_provider_errors_total").increment(1);
                report.failed_feeds.push(feed.name().to_string());
            }
        }
    }

    let (records, dups) = dedup_and_sort(all);
    counter!("ingest_dropped_total").increment(report.dropped as u64);
    counter!("ingest_dedup_total").increment(dups as u64);

    report.records = records;
    report.duplicates = dups;
    report
}
