//! Signal records: one headline event plus the labels derived from it.

use chrono::{DateTime, Utc};

use crate::labels::{Label, LabelSet};

/// One headline event as it moves through the pipeline.
///
/// Created by ingest, enriched by classification, read by aggregation and
/// briefing. Enrichment returns a new value; nothing mutates a record that
/// has already been aggregated.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    /// `None` only when a stored timestamp could not be parsed.
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
    pub title: String,
    pub url: String,
    /// Keyword-derived label.
    pub tag: Label,
    /// Set only for records that went through the classifier.
    pub ai_label: Option<Label>,
    pub ai_confidence: f32,
    pub ai_reason: String,
    pub final_tag: Label,
}

impl SignalRecord {
    /// A freshly tagged record; `final_tag` starts equal to `tag`.
    pub fn tagged(
        published_at: DateTime<Utc>,
        source: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        tag: Label,
    ) -> Self {
        Self {
            published_at: Some(published_at),
            source: source.into(),
            title: title.into(),
            url: url.into(),
            final_tag: tag.clone(),
            tag,
            ai_label: None,
            ai_confidence: 0.0,
            ai_reason: String::new(),
        }
    }

    /// Copy of this record carrying classifier output and the resulting final tag.
    pub fn with_classification(
        &self,
        ai_label: Label,
        ai_confidence: f32,
        ai_reason: impl Into<String>,
        final_tag: Label,
    ) -> Self {
        Self {
            ai_label: Some(ai_label),
            ai_confidence,
            ai_reason: ai_reason.into(),
            final_tag,
            ..self.clone()
        }
    }
}

/// Parse a stored or feed timestamp into UTC.
///
/// Accepts RFC 3339, RFC 2822 and the `YYYY-MM-DD HH:MM:SS[.f]±HH:MM` form
/// pandas writes. Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Map `tag` and `final_tag` onto members of `labels`; anything outside the
/// set becomes `other`. Applied to stored files, which may predate the
/// current label configuration.
pub fn conform_labels(records: Vec<SignalRecord>, labels: &LabelSet) -> Vec<SignalRecord> {
    records
        .into_iter()
        .map(|mut r| {
            r.tag = labels.conform(&r.tag);
            r.final_tag = labels.conform(&r.final_tag);
            r
        })
        .collect()
}

/// Records in the ambiguous bucket: keyword tag is `other` and there is a
/// title to classify.
pub fn needs_classification(record: &SignalRecord) -> bool {
    record.tag.is_other() && !record.title.trim().is_empty()
}
