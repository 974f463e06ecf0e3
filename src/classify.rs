//! # Confidence-gated classifier
//!
//! Resolves the ambiguous bucket (records whose keyword tag is `other`) with
//! one LLM call per record. Model output is validated into a
//! [`ClassifyOutcome`]; every failure maps to the same safe default
//! (`other`, 0.0, failure kind) and the batch always runs to the end.
//!
//! A record is promoted (its `final_tag` replaced by the model label) only when
//! the confidence reaches the gate threshold and the label is not `other`.

use std::collections::BTreeMap;
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ClassifierConfig;
use crate::json_extract::extract_json_object;
use crate::labels::{Label, LabelSet};
use crate::llm::{sanitize_line, DynLlmClient, LlmError};
use crate::record::{conform_labels, needs_classification, SignalRecord};

/// Validated model answer for one headline.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: Label,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    pub reason: String,
}

impl Classification {
    /// `other` / 0.0 annotated with why the answer was discarded.
    pub fn safe_default(reason: impl Into<String>) -> Self {
        Self {
            label: Label::other(),
            confidence: 0.0,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifyFailure {
    #[error("model output contained no JSON object")]
    ParseFailed,
    #[error("model label `{0}` is not in the label set")]
    InvalidLabel(String),
    #[error("model confidence missing or not numeric")]
    InvalidConfidence,
    #[error("classification call failed: {0}")]
    Call(#[from] LlmError),
}

impl ClassifyFailure {
    /// Annotation stored in `ai_reason`.
    pub fn reason(&self) -> String {
        match self {
            ClassifyFailure::ParseFailed => "parse_failed".to_string(),
            ClassifyFailure::InvalidLabel(_) => "invalid_label".to_string(),
            ClassifyFailure::InvalidConfidence => "invalid_confidence".to_string(),
            ClassifyFailure::Call(e) => format!("error:{}", e.kind()),
        }
    }
}

pub type ClassifyOutcome = Result<Classification, ClassifyFailure>;

/// Map any failure to the safe default.
pub fn resolve_outcome(outcome: ClassifyOutcome) -> Classification {
    outcome.unwrap_or_else(|failure| Classification::safe_default(failure.reason()))
}

/// Promotion threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    pub min_confidence: f32,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            min_confidence: 0.60,
        }
    }
}

impl ConfidenceGate {
    pub fn promotes(&self, c: &Classification) -> bool {
        c.confidence >= self.min_confidence && !c.label.is_other()
    }
}

/// New record carrying the classifier output; `final_tag` is the model label
/// when the gate promotes it, the keyword tag otherwise.
pub fn enrich(record: &SignalRecord, outcome: ClassifyOutcome, gate: ConfidenceGate) -> SignalRecord {
    let c = resolve_outcome(outcome);
    let final_tag = if gate.promotes(&c) {
        c.label.clone()
    } else {
        record.tag.clone()
    };
    record.with_classification(c.label, c.confidence, c.reason, final_tag)
}

/// System prompt listing the allowed labels and their definitions.
pub fn classifier_instructions(labels: &LabelSet) -> String {
    let names: Vec<&str> = labels.labels().map(Label::as_str).collect();
    let mut out = String::new();
    out.push_str("You classify GPU/AI-related news headlines into exactly ONE label.\n\n");
    out.push_str(&format!("Allowed labels: {}\n\nDefinitions:\n", names.join(", ")));
    for (label, desc) in labels.definitions() {
        if desc.is_empty() {
            out.push_str(&format!("- {label}\n"));
        } else {
            out.push_str(&format!("- {label}: {desc}\n"));
        }
    }
    out.push_str(
        "\nReturn ONLY valid JSON:\n{\"label\":\"<one label>\", \"confidence\": <0..1>, \"reason\":\"<=12 words\"}\n",
    );
    out
}

/// Validate raw model text against the label set.
pub fn interpret_response(text: &str, labels: &LabelSet, reason_max_chars: usize) -> ClassifyOutcome {
    let obj = extract_json_object(text).ok_or(ClassifyFailure::ParseFailed)?;

    let raw_label = match obj.get("label") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let label = labels
        .resolve(&raw_label)
        .ok_or_else(|| ClassifyFailure::InvalidLabel(raw_label.clone()))?;

    let confidence = obj
        .get("confidence")
        .and_then(parse_confidence)
        .ok_or(ClassifyFailure::InvalidConfidence)?;

    let reason = match obj.get("reason") {
        Some(Value::String(s)) => sanitize_line(s, reason_max_chars),
        Some(Value::Null) | None => String::new(),
        Some(other) => sanitize_line(&other.to_string(), reason_max_chars),
    };

    Ok(Classification {
        label,
        confidence,
        reason,
    })
}

/// JSON number or numeric string, clamped to `[0, 1]`.
fn parse_confidence(v: &Value) -> Option<f32> {
    let x = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !x.is_finite() {
        return None;
    }
    Some(x.clamp(0.0, 1.0) as f32)
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("classify_calls_total", "Classification calls issued.");
        describe_counter!(
            "classify_failures_total",
            "Classification calls that fell back to the safe default."
        );
        describe_counter!(
            "classify_promoted_total",
            "Records whose final tag was promoted to the model label."
        );
    });
}

/// Counts from one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub candidates: usize,
    pub classified: usize,
    pub failures: usize,
    pub promoted: usize,
}

pub struct Classifier {
    client: DynLlmClient,
    labels: LabelSet,
    instructions: String,
    gate: ConfidenceGate,
    pacing: Duration,
    reason_max_chars: usize,
}

impl Classifier {
    pub fn new(client: DynLlmClient, labels: LabelSet, cfg: &ClassifierConfig) -> Self {
        Self {
            client,
            instructions: classifier_instructions(&labels),
            labels,
            gate: ConfidenceGate {
                min_confidence: cfg.min_confidence,
            },
            pacing: Duration::from_millis(cfg.pacing_ms),
            reason_max_chars: cfg.reason_max_chars,
        }
    }

    pub fn gate(&self) -> ConfidenceGate {
        self.gate
    }

    /// One external call for one headline.
    pub async fn classify_title(&self, title: &str) -> ClassifyOutcome {
        let input = format!("Headline: {}", title.trim());
        let text = self.client.complete(&self.instructions, &input).await?;
        interpret_response(&text, &self.labels, self.reason_max_chars)
    }

    /// Classify the ambiguous bucket, strictly one call at a time with the
    /// configured pause between calls. Records outside the bucket pass through.
    /// Tags outside the label set count as `other` and join the bucket.
    pub async fn classify_batch(&self, records: Vec<SignalRecord>) -> (Vec<SignalRecord>, BatchStats) {
        ensure_metrics_described();
        let records = conform_labels(records, &self.labels);

        let mut stats = BatchStats {
            candidates: records.iter().filter(|r| needs_classification(r)).count(),
            ..Default::default()
        };
        info!(
            target: "classify",
            candidates = stats.candidates,
            provider = self.client.provider_name(),
            "classifying records tagged 'other'"
        );

        let mut out = Vec::with_capacity(records.len());
        for record in records {
            if !needs_classification(&record) {
                out.push(record);
                continue;
            }

            if stats.classified > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            counter!("classify_calls_total").increment(1);
            let outcome = self.classify_title(&record.title).await;
            if let Err(failure) = &outcome {
                stats.failures += 1;
                counter!("classify_failures_total").increment(1);
                warn!(target: "classify", error = %failure, url = %record.url, "falling back to 'other'");
            }

            let enriched = enrich(&record, outcome, self.gate);
            if enriched.final_tag != enriched.tag {
                stats.promoted += 1;
                counter!("classify_promoted_total").increment(1);
            }
            out.push(enriched);

            stats.classified += 1;
            if stats.classified % 10 == 0 || stats.classified == stats.candidates {
                info!(
                    target: "classify",
                    "processed {}/{} 'other' rows", stats.classified, stats.candidates
                );
            }
        }

        info!(
            target: "classify",
            promoted = stats.promoted,
            failures = stats.failures,
            distribution = ?final_tag_distribution(&out),
            "classification finished"
        );
        (out, stats)
    }
}

/// `final_tag` → record count.
pub fn final_tag_distribution(records: &[SignalRecord]) -> BTreeMap<String, usize> {
    let mut m = BTreeMap::new();
    for r in records {
        *m.entry(r.final_tag.to_string()).or_insert(0) += 1;
    }
    m
}
