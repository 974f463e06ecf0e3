//! Compact headline digest handed to the summarization model.

use std::fmt::Write as _;

use crate::aggregate::count_by_tag;
use crate::record::SignalRecord;

/// How much of the window goes into the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestShape {
    pub top_tags: usize,
    pub headlines_per_tag: usize,
}

impl DigestShape {
    pub const COMPACT: DigestShape = DigestShape {
        top_tags: 4,
        headlines_per_tag: 2,
    };
    pub const FULL: DigestShape = DigestShape {
        top_tags: 10,
        headlines_per_tag: 4,
    };
}

/// Top tags by count, each followed by its most recent headlines:
///
/// ```text
/// ## earnings (count=3)
/// - [NVIDIA Blog] Record quarter (https://...)
/// ```
pub fn format_digest(recent: &[&SignalRecord], shape: DigestShape) -> String {
    let counts = count_by_tag(recent).top(shape.top_tags);
    let mut out = String::new();
    for (tag, count) in counts.iter() {
        let _ = write!(out, "\n## {tag} (count={count})");

        let mut rows: Vec<&SignalRecord> = recent
            .iter()
            .copied()
            .filter(|r| &r.final_tag == tag)
            .collect();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        for r in rows.into_iter().take(shape.headlines_per_tag) {
            let _ = write!(
                out,
                "\n- [{}] {} ({})",
                r.source.trim(),
                r.title.trim(),
                r.url.trim()
            );
        }
    }
    out
}
