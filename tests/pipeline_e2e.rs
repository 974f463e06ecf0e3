use std::sync::Arc;

use chrono::{TimeZone, Utc};
use gpu_signal_tracker::briefing::Mode;
use gpu_signal_tracker::ingest::providers::rss::RssFeed;
use gpu_signal_tracker::ingest::types::FeedSource;
use gpu_signal_tracker::llm::ScriptedClient;
use gpu_signal_tracker::pipeline;
use gpu_signal_tracker::store::{read_records, write_records, Schema};
use gpu_signal_tracker::{Label, PipelineConfig, SignalRecord};

const NVIDIA_RSS: &str = include_str!("fixtures/nvidia_rss.xml");
const VERGE_ATOM: &str = include_str!("fixtures/verge_atom.xml");

const NARRATIVE: &str = r#"{"executive_summary":["Strong quarter"],"what_changed":["MI300 arrives"],"watchlist":["Blackwell supply"],"notable_headlines":["NVIDIA Reports Record Quarter Revenue"]}"#;

fn config(dir: &std::path::Path) -> PipelineConfig {
    let mut cfg = PipelineConfig::from_toml_str("", std::path::Path::new("inline")).unwrap();
    cfg.paths.data_dir = dir.join("data");
    cfg.classifier.pacing_ms = 0;
    cfg
}

fn fixture_feeds() -> Vec<Box<dyn FeedSource>> {
    vec![
        Box::new(RssFeed::from_fixture("NVIDIA Blog", NVIDIA_RSS)),
        Box::new(RssFeed::from_fixture("The Verge", VERGE_ATOM)),
    ]
}

#[tokio::test]
async fn fetch_classify_brief_plot() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let now = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();

    let report = pipeline::fetch_with(&cfg, &fixture_feeds(), now).await.unwrap();
    assert_eq!(report.records.len(), 5);
    assert_eq!(read_records(&cfg.paths.signals()).unwrap().len(), 5);

    // two 'other' rows (classified newest first), then daily and weekly narratives
    let client = Arc::new(ScriptedClient::replies([
        r#"{"label":"cloud_partnerships","confidence":0.9,"reason":"partners expand cloud"}"#,
        r#"{"label":"other","confidence":0.95,"reason":"consumer pricing"}"#,
        NARRATIVE,
        NARRATIVE,
    ]));
    pipeline::run_after_fetch(&cfg, client.clone()).await.unwrap();

    let classified = read_records(&cfg.paths.signals_ai()).unwrap();
    let finals: Vec<&str> = classified.iter().map(|r| r.final_tag.as_str()).collect();
    assert_eq!(
        finals,
        vec!["earnings", "competition", "product_launch", "cloud_partnerships", "other"]
    );
    assert_eq!(classified[3].ai_reason, "partners expand cloud");
    assert_eq!(classified[4].ai_label, Some(Label::other()));

    let calls = client.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[0].1.contains("Europe"));
    assert!(calls[2].0.contains("daily"));
    assert!(calls[3].0.contains("weekly"));

    let daily = std::fs::read_to_string(cfg.paths.briefing(Mode::Daily)).unwrap();
    assert!(daily.contains("- **earnings**: 1"));
    assert!(daily.contains("- **competition**: 1"));
    assert!(!daily.contains("cloud_partnerships"));

    let weekly = std::fs::read_to_string(cfg.paths.briefing(Mode::Weekly)).unwrap();
    assert!(weekly.contains("- **cloud_partnerships**: 1"));
    assert!(weekly.contains("- Strong quarter"));

    let svg = std::fs::read_to_string(cfg.paths.chart()).unwrap();
    assert!(svg.contains("<title>cloud_partnerships: 1</title>"));
    assert_eq!(svg.matches("<title>").count(), 5);
}

#[tokio::test]
async fn brief_without_recent_data_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    let mut undated = SignalRecord::tagged(
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        "NVIDIA Blog",
        "t",
        "u",
        Label::new("earnings"),
    );
    undated.published_at = None;
    write_records(&cfg.paths.signals(), &[undated], Schema::Tagged).unwrap();

    let client = ScriptedClient::default();
    let out = pipeline::brief_with(&cfg, Mode::Weekly, &client).await.unwrap();
    assert!(out.is_none());
    assert!(!cfg.paths.briefing(Mode::Weekly).exists());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn brief_prefers_classified_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let ts = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

    let tagged = SignalRecord::tagged(ts, "S", "plain", "u1", Label::other());
    let promoted = tagged.with_classification(
        Label::new("ai_demand"),
        0.8,
        "orders",
        Label::new("ai_demand"),
    );
    write_records(&cfg.paths.signals(), &[tagged], Schema::Tagged).unwrap();
    write_records(&cfg.paths.signals_ai(), &[promoted], Schema::Classified).unwrap();

    let client = ScriptedClient::replies([NARRATIVE]);
    let path = pipeline::brief_with(&cfg, Mode::Daily, &client)
        .await
        .unwrap()
        .unwrap();
    let md = std::fs::read_to_string(path).unwrap();
    assert!(md.contains("- **ai_demand**: 1"));
}

#[test]
fn plot_with_no_input_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    assert!(pipeline::plot_stage(&cfg).is_err());
}

#[tokio::test]
async fn stored_labels_outside_the_set_are_briefed_and_plotted_as_other() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let ts = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

    let odd = SignalRecord::tagged(ts, "S", "odd one", "u1", Label::new("memes"));
    write_records(&cfg.paths.signals(), &[odd], Schema::Tagged).unwrap();

    let client = ScriptedClient::replies([NARRATIVE]);
    let path = pipeline::brief_with(&cfg, Mode::Daily, &client)
        .await
        .unwrap()
        .unwrap();
    let md = std::fs::read_to_string(path).unwrap();
    assert!(md.contains("- **other**: 1"));
    assert!(!md.contains("memes"));

    let svg = std::fs::read_to_string(pipeline::plot_stage(&cfg).unwrap()).unwrap();
    assert!(svg.contains("<title>other: 1</title>"));
    assert!(!svg.contains("memes"));
}
