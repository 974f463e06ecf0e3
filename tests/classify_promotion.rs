use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use gpu_signal_tracker::classify::{enrich, interpret_response, Classifier, ClassifyFailure, ConfidenceGate};
use gpu_signal_tracker::config::ClassifierConfig;
use gpu_signal_tracker::labels::{Label, LabelSet};
use gpu_signal_tracker::llm::{LlmError, ScriptedClient};
use gpu_signal_tracker::SignalRecord;

fn rec(title: &str, tag: &str) -> SignalRecord {
    SignalRecord::tagged(
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        "NVIDIA Blog",
        title,
        format!("https://blogs.nvidia.com/{}", title.len()),
        Label::new(tag),
    )
}

fn cfg(pacing_ms: u64) -> ClassifierConfig {
    ClassifierConfig {
        pacing_ms,
        ..ClassifierConfig::default()
    }
}

fn outcome(text: &str) -> gpu_signal_tracker::classify::ClassifyOutcome {
    interpret_response(text, &LabelSet::default_seed(), 80)
}

#[test]
fn confident_answer_promotes() {
    let r = rec("Something ambiguous", "other");
    let out = enrich(
        &r,
        outcome(r#"{"label":"earnings","confidence":0.82,"reason":"quarterly numbers"}"#),
        ConfidenceGate::default(),
    );
    assert_eq!(out.final_tag.as_str(), "earnings");
    assert_eq!(out.ai_label.as_ref().map(Label::as_str), Some("earnings"));
    assert!((out.ai_confidence - 0.82).abs() < 1e-6);
    // input untouched
    assert!(r.ai_label.is_none());
    assert!(r.final_tag.is_other());
}

#[test]
fn low_confidence_keeps_keyword_tag() {
    let r = rec("Something ambiguous", "other");
    let out = enrich(
        &r,
        outcome(r#"{"label":"earnings","confidence":0.40,"reason":"maybe"}"#),
        ConfidenceGate::default(),
    );
    assert_eq!(out.final_tag.as_str(), "other");
    assert_eq!(out.ai_label.as_ref().map(Label::as_str), Some("earnings"));
    assert!((out.ai_confidence - 0.40).abs() < 1e-6);
}

#[test]
fn threshold_is_inclusive() {
    let r = rec("Something ambiguous", "other");
    let out = enrich(
        &r,
        outcome(r#"{"label":"ai_demand","confidence":0.6}"#),
        ConfidenceGate::default(),
    );
    assert_eq!(out.final_tag.as_str(), "ai_demand");
}

#[test]
fn unknown_label_is_discarded_regardless_of_confidence() {
    let o = outcome(r#"{"label":"crypto","confidence":0.99,"reason":"x"}"#);
    assert!(matches!(o, Err(ClassifyFailure::InvalidLabel(ref l)) if l == "crypto"));

    let out = enrich(&rec("t", "other"), o, ConfidenceGate::default());
    assert!(out.final_tag.is_other());
    assert_eq!(out.ai_label.as_ref().map(Label::as_str), Some("other"));
    assert_eq!(out.ai_confidence, 0.0);
    assert_eq!(out.ai_reason, "invalid_label");
}

#[test]
fn prose_around_json_and_out_of_range_confidence() {
    let c = outcome("Sure! {\"label\":\" Regulation_Export \",\"confidence\":\"1.7\",\"reason\":\"new rules\"} Hope that helps.")
        .unwrap();
    assert_eq!(c.label.as_str(), "regulation_export");
    assert_eq!(c.confidence, 1.0);
}

#[test]
fn garbage_and_missing_confidence_are_failures() {
    assert!(matches!(outcome("no json here"), Err(ClassifyFailure::ParseFailed)));
    assert!(matches!(
        outcome(r#"{"label":"earnings"}"#),
        Err(ClassifyFailure::InvalidConfidence)
    ));
}

#[tokio::test]
async fn batch_only_calls_for_other_and_survives_failures() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(r#"{"label":"earnings","confidence":0.82,"reason":"r1"}"#.to_string()),
        Err(LlmError::Status(429)),
        Ok("not json".to_string()),
    ]));
    let classifier = Classifier::new(client.clone(), LabelSet::default_seed(), &cfg(0));

    let records = vec![
        rec("first ambiguous", "other"),
        rec("NVIDIA launches Blackwell GPU", "product_launch"),
        rec("second ambiguous", "other"),
        rec("third ambiguous", "other"),
    ];
    let (out, stats) = classifier.classify_batch(records).await;

    assert_eq!(out.len(), 4);
    assert_eq!(stats.candidates, 3);
    assert_eq!(stats.classified, 3);
    assert_eq!(stats.failures, 2);
    assert_eq!(stats.promoted, 1);

    assert_eq!(out[0].final_tag.as_str(), "earnings");
    assert_eq!(out[1].final_tag.as_str(), "product_launch");
    assert!(out[1].ai_label.is_none());
    assert_eq!(out[2].ai_reason, "error:rate_limited");
    assert!(out[2].final_tag.is_other());
    assert_eq!(out[3].ai_reason, "parse_failed");

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].1, "Headline: first ambiguous");
    assert!(calls[0].0.contains("Allowed labels:"));
    assert!(calls[0].0.contains("datacenter_ai"));
}

#[tokio::test]
async fn calls_are_spaced_by_the_pacing_delay() {
    let reply = r#"{"label":"other","confidence":0.9,"reason":"none"}"#;
    let client = Arc::new(ScriptedClient::replies([reply, reply, reply]));
    let classifier = Classifier::new(client, LabelSet::default_seed(), &cfg(30));

    let records = vec![rec("a", "other"), rec("b", "other"), rec("c", "other")];
    let started = Instant::now();
    let (_, stats) = classifier.classify_batch(records).await;
    assert_eq!(stats.classified, 3);
    assert_eq!(stats.promoted, 0);
    // two gaps between three calls
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn stored_tag_outside_label_set_is_classified_as_other() {
    let csv = "published_at,source,title,url,tag\n\
2025-03-01T12:00:00+00:00,NVIDIA Blog,Some headline,https://x/1,memes\n\
2025-03-01T11:00:00+00:00,NVIDIA Blog,Another headline,https://x/2,memes\n";
    let records = gpu_signal_tracker::store::read_records_from(csv.as_bytes()).unwrap();

    let client = Arc::new(ScriptedClient::replies([
        r#"{"label":"ai_demand","confidence":0.9,"reason":"orders"}"#,
        r#"{"label":"ai_demand","confidence":0.2,"reason":"unsure"}"#,
    ]));
    let labels = LabelSet::default_seed();
    let classifier = Classifier::new(client.clone(), labels.clone(), &cfg(0));
    let (out, stats) = classifier.classify_batch(records).await;

    assert_eq!(stats.candidates, 2);
    assert_eq!(client.calls().len(), 2);
    assert_eq!(out[0].final_tag.as_str(), "ai_demand");
    assert!(out[1].tag.is_other());
    assert!(out[1].final_tag.is_other());
    assert!(out.iter().all(|r| labels.contains(&r.final_tag)));
}
