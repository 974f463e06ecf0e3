//! Narrative sections returned by the summarization model.

use serde_json::Value;

use super::Mode;
use crate::json_extract::extract_json_object;
use crate::llm::sanitize_line;

pub const PARSE_FAILED: &str = "(parse_failed)";
pub const NO_CONTENT: &str = "(no content)";
/// Raw model text kept when the answer cannot be parsed.
pub const RAW_EXCERPT_CHARS: usize = 200;
pub const MAX_WORDS_PER_BULLET: usize = 18;

/// `(json key, heading, max bullets)` in document order.
pub const SECTIONS: [(&str, &str, usize); 4] = [
    ("executive_summary", "Executive summary", 3),
    ("what_changed", "What changed", 3),
    ("watchlist", "Watchlist", 3),
    ("notable_headlines", "Notable headlines", 5),
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Narrative {
    pub executive_summary: Vec<String>,
    pub what_changed: Vec<String>,
    pub watchlist: Vec<String>,
    pub notable_headlines: Vec<String>,
}

impl Narrative {
    /// Placeholder narrative that still surfaces what the model said: the
    /// first [`RAW_EXCERPT_CHARS`] characters of the trimmed answer, line
    /// breaks included.
    pub fn degraded(raw: &str) -> Self {
        let excerpt: String = raw.trim().chars().take(RAW_EXCERPT_CHARS).collect();
        Self {
            executive_summary: vec![PARSE_FAILED.to_string()],
            what_changed: vec![PARSE_FAILED.to_string()],
            watchlist: vec![PARSE_FAILED.to_string()],
            notable_headlines: vec![if excerpt.is_empty() {
                PARSE_FAILED.to_string()
            } else {
                excerpt
            }],
        }
    }

    /// `(heading, bullets)` in document order.
    pub fn sections(&self) -> [(&'static str, &[String]); 4] {
        [
            (SECTIONS[0].1, self.executive_summary.as_slice()),
            (SECTIONS[1].1, self.what_changed.as_slice()),
            (SECTIONS[2].1, self.watchlist.as_slice()),
            (SECTIONS[3].1, self.notable_headlines.as_slice()),
        ]
    }
}

pub fn narrative_instructions(mode: Mode) -> String {
    format!(
        "You are writing a {mode} GPU/NVIDIA market briefing based ONLY on the headlines provided.\n\
         Do NOT invent facts. Do NOT add numbers or claims not supported by the titles.\n\
         \n\
         Return ONLY valid JSON with keys:\n\
         - executive_summary: {} bullet points\n\
         - what_changed: {} bullet points\n\
         - watchlist: {} bullet points\n\
         - notable_headlines: {} bullet points (each must reference a provided headline)\n\
         Keep each bullet <= {MAX_WORDS_PER_BULLET} words.\n",
        SECTIONS[0].2,
        SECTIONS[1].2,
        SECTIONS[2].2,
        SECTIONS[3].2,
        mode = mode.as_str(),
    )
}

/// Parse model text into the four sections. Unparseable text degrades to
/// placeholders; a missing or empty section gets one `(no content)` bullet.
pub fn parse_narrative(text: &str) -> Narrative {
    let Some(obj) = extract_json_object(text) else {
        return Narrative::degraded(text);
    };

    let mut sections = SECTIONS.iter().map(|(key, _, max)| {
        let bullets = obj.get(*key).map(|v| bullets(v, *max)).unwrap_or_default();
        if bullets.is_empty() {
            vec![NO_CONTENT.to_string()]
        } else {
            bullets
        }
    });

    Narrative {
        executive_summary: sections.next().unwrap_or_default(),
        what_changed: sections.next().unwrap_or_default(),
        watchlist: sections.next().unwrap_or_default(),
        notable_headlines: sections.next().unwrap_or_default(),
    }
}

fn bullets(v: &Value, max: usize) -> Vec<String> {
    let items: Vec<String> = match v {
        Value::Array(items) => items.iter().map(bullet_text).collect(),
        Value::Null => Vec::new(),
        other => vec![bullet_text(other)],
    };
    items
        .into_iter()
        .map(|s| cap_words(&s, MAX_WORDS_PER_BULLET))
        .filter(|s| !s.is_empty())
        .take(max)
        .collect()
}

fn bullet_text(v: &Value) -> String {
    match v {
        Value::String(s) => sanitize_line(s, 1_000),
        Value::Null => String::new(),
        other => sanitize_line(&other.to_string(), 1_000),
    }
}

fn cap_words(s: &str, max: usize) -> String {
    s.split_whitespace().take(max).collect::<Vec<_>>().join(" ")
}
