//! Keyword tagger.
//!
//! Ordered keyword groups, each pointing at one label. A title gets the label
//! of the first group with any keyword appearing in it (case-insensitive,
//! whitespace-condensed substring match); `other` when nothing matches.

use serde::Deserialize;

use crate::config::ConfigError;
use crate::labels::{Label, LabelSet};

/// One `[[tagger.groups]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KeywordGroup {
    pub label: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct KeywordTagger {
    groups: Vec<(Label, Vec<String>)>,
}

impl KeywordTagger {
    /// Build a tagger; every group label must belong to `labels`.
    pub fn new(groups: &[KeywordGroup], labels: &LabelSet) -> Result<Self, ConfigError> {
        let mut out = Vec::with_capacity(groups.len());
        for g in groups {
            let label = labels
                .resolve(&g.label)
                .ok_or_else(|| ConfigError::UnknownLabel(g.label.clone()))?;
            let keywords: Vec<String> = g
                .keywords
                .iter()
                .map(|k| normalize(k))
                .filter(|k| !k.is_empty())
                .collect();
            out.push((label, keywords));
        }
        Ok(Self { groups: out })
    }

    /// Label for `title`. Empty titles fall through to `other`.
    pub fn tag(&self, title: &str) -> Label {
        let text = normalize(title);
        if text.is_empty() {
            return Label::other();
        }
        self.groups
            .iter()
            .find(|(_, words)| words.iter().any(|w| text.contains(w.as_str())))
            .map(|(label, _)| label.clone())
            .unwrap_or_else(Label::other)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// GPU / NVIDIA keyword groups, in priority order.
pub fn default_groups() -> Vec<KeywordGroup> {
    [
        ("earnings", &["earnings", "quarter", "guidance", "revenue"][..]),
        (
            "product_launch",
            &[
                "launch", "announces", "release", "blackwell", "h200", "h100", "rtx", "geforce",
            ][..],
        ),
        (
            "datacenter_ai",
            &[
                "datacenter",
                "data center",
                "inference",
                "training",
                "ai",
                "accelerator",
            ][..],
        ),
        ("competition", &["amd", "intel", "mi300", "gaudi"][..]),
        (
            "regulation_export",
            &["export", "restriction", "sanction", "china", "regulator"][..],
        ),
    ]
    .into_iter()
    .map(|(label, words)| KeywordGroup {
        label: label.to_string(),
        keywords: words.iter().map(|w| w.to_string()).collect(),
    })
    .collect()
}

/// Lowercase and condense runs of whitespace to one space.
fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}
