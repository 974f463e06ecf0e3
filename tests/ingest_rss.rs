use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gpu_signal_tracker::ingest::providers::rss::{parse_feed, RssFeed};
use gpu_signal_tracker::ingest::run_once;
use gpu_signal_tracker::ingest::types::{FeedSource, RawEntry};
use gpu_signal_tracker::labels::LabelSet;
use gpu_signal_tracker::tagger::{default_groups, KeywordTagger};

const NVIDIA_RSS: &str = include_str!("fixtures/nvidia_rss.xml");
const VERGE_ATOM: &str = include_str!("fixtures/verge_atom.xml");

fn tagger() -> KeywordTagger {
    KeywordTagger::new(&default_groups(), &LabelSet::default_seed()).unwrap()
}

struct BrokenFeed;

#[async_trait]
impl FeedSource for BrokenFeed {
    async fn fetch_entries(&self) -> Result<Vec<RawEntry>> {
        Err(anyhow!("connection reset"))
    }
    fn name(&self) -> &str {
        "Broken"
    }
}

#[test]
fn rss_fixture_parses() {
    let entries = parse_feed(NVIDIA_RSS).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries[2].title.as_deref(),
        Some("Partners & Customers Expand Cloud Footprint in Europe")
    );
    assert_eq!(
        entries[0].published.as_deref(),
        Some("Tue, 04 Mar 2025 18:00:00 +0000")
    );
}

#[test]
fn atom_fixture_parses() {
    let entries = parse_feed(VERGE_ATOM).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[1].link.as_deref(), Some("https://www.theverge.com/streaming-prices"));
    assert!(entries[1].published.is_none());
}

#[tokio::test]
async fn both_feeds_are_tagged_deduped_and_sorted() {
    let feeds: Vec<Box<dyn FeedSource>> = vec![
        Box::new(RssFeed::from_fixture("NVIDIA Blog", NVIDIA_RSS)),
        Box::new(RssFeed::from_fixture("The Verge", VERGE_ATOM)),
    ];
    let now = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
    let report = run_once(&feeds, &tagger(), 50, now).await;

    assert!(report.failed_feeds.is_empty());
    assert_eq!(report.dropped, 2);
    assert_eq!(report.duplicates, 1);

    let got: Vec<(&str, &str, &str)> = report
        .records
        .iter()
        .map(|r| (r.source.as_str(), r.title.as_str(), r.tag.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("NVIDIA Blog", "NVIDIA Reports Record Quarter Revenue", "earnings"),
            ("The Verge", "AMD unveils MI300 chip", "competition"),
            ("NVIDIA Blog", "NVIDIA launches Blackwell GPU", "product_launch"),
            (
                "NVIDIA Blog",
                "Partners & Customers Expand Cloud Footprint in Europe",
                "other"
            ),
            ("The Verge", "Streaming service hikes its prices", "other"),
        ]
    );
    // Atom entry without <published> uses <updated>
    assert_eq!(
        report.records[4].published_at,
        Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap())
    );
    assert!(report.records.iter().all(|r| r.final_tag == r.tag));
}

#[tokio::test]
async fn per_feed_cap_applies_before_cleanup() {
    let feeds: Vec<Box<dyn FeedSource>> =
        vec![Box::new(RssFeed::from_fixture("NVIDIA Blog", NVIDIA_RSS))];
    let now = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
    let report = run_once(&feeds, &tagger(), 2, now).await;
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.dropped, 0);
}

#[tokio::test]
async fn failing_feed_does_not_stop_the_others() {
    let feeds: Vec<Box<dyn FeedSource>> = vec![
        Box::new(BrokenFeed),
        Box::new(RssFeed::from_fixture("The Verge", VERGE_ATOM)),
    ];
    let now = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
    let report = run_once(&feeds, &tagger(), 50, now).await;
    assert_eq!(report.failed_feeds, vec!["Broken".to_string()]);
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn atom_entry_with_split_links_keeps_the_feed() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>WordPress blog</title>
  <entry>
    <title type="html">NVIDIA announces H200 availability</title>
    <link rel="alternate" type="text/html" href="https://blog.example.com/h200"/>
    <id>https://blog.example.com/?p=101</id>
    <updated>2025-03-04T10:00:00Z</updated>
    <published>2025-03-04T09:00:00Z</published>
    <link rel="replies" type="text/html" href="https://blog.example.com/h200#comments"/>
  </entry>
  <entry>
    <title type="html">Streaming service hikes its prices</title>
    <link rel="alternate" href="https://blog.example.com/prices"/>
    <id>https://blog.example.com/?p=102</id>
    <link rel="replies" href="https://blog.example.com/prices#comments"/>
    <published>2025-03-03T09:00:00Z</published>
  </entry>
</feed>"#;
    let feeds: Vec<Box<dyn FeedSource>> = vec![Box::new(RssFeed::from_fixture("Blog", xml))];
    let now = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
    let report = run_once(&feeds, &tagger(), 50, now).await;

    assert!(report.failed_feeds.is_empty());
    let got: Vec<(&str, &str)> = report
        .records
        .iter()
        .map(|r| (r.url.as_str(), r.tag.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("https://blog.example.com/h200", "product_launch"),
            ("https://blog.example.com/prices", "other"),
        ]
    );
}

#[tokio::test]
async fn unreachable_http_feed_is_reported_once() {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap();
    let feed = RssFeed::from_url("Down", "http://127.0.0.1:9/feed", client);
    let err = feed.fetch_entries().await.unwrap_err();
    assert!(format!("{err:#}").contains("GET http://127.0.0.1:9/feed"));

    let feeds: Vec<Box<dyn FeedSource>> = vec![Box::new(feed)];
    let now = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
    let report = run_once(&feeds, &tagger(), 50, now).await;
    assert_eq!(report.failed_feeds, vec!["Down".to_string()]);
    assert!(report.records.is_empty());
}
