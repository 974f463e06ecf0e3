//! # Labels
//!
//! The classification vocabulary shared by the keyword tagger, the LLM
//! classifier and the aggregator. A [`LabelSet`] is injected from
//! configuration; `other` is always a member.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the catch-all label.
pub const OTHER: &str = "other";

/// One entry of the label vocabulary (e.g. `earnings`, `product_launch`).
///
/// Deserialized through [`Label::new`], so stored text is normalized too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Label(String);

impl Label {
    /// Build a label from free text: trimmed and ASCII-lowercased.
    /// Blank input yields `other`.
    pub fn new(raw: &str) -> Self {
        let s = raw.trim().to_ascii_lowercase();
        if s.is_empty() {
            Self::other()
        } else {
            Self(s)
        }
    }

    pub fn other() -> Self {
        Self(OTHER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_other(&self) -> bool {
        self.0 == OTHER
    }
}

impl From<String> for Label {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A label plus the one-line definition shown to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Ordered, closed label vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    defs: Vec<(Label, String)>,
}

impl LabelSet {
    /// Build from definitions. Duplicates are dropped (first wins) and
    /// `other` is appended when missing.
    pub fn from_defs<I>(defs: I) -> Self
    where
        I: IntoIterator<Item = LabelDef>,
    {
        let mut out: Vec<(Label, String)> = Vec::new();
        for d in defs {
            if d.name.trim().is_empty() {
                continue;
            }
            let label = Label::new(&d.name);
            if out.iter().any(|(l, _)| *l == label) {
                continue;
            }
            out.push((label, d.description.trim().to_string()));
        }
        if !out.iter().any(|(l, _)| l.is_other()) {
            out.push((Label::other(), "none of the above".to_string()));
        }
        Self { defs: out }
    }

    /// Convenience for tests: names only, no descriptions.
    pub fn from_names(names: &[&str]) -> Self {
        Self::from_defs(names.iter().map(|n| LabelDef {
            name: (*n).to_string(),
            description: String::new(),
        }))
    }

    /// Resolve free text to a member of the set (trim + lowercase, exact match).
    pub fn resolve(&self, raw: &str) -> Option<Label> {
        let wanted = raw.trim().to_ascii_lowercase();
        self.defs
            .iter()
            .find(|(l, _)| l.as_str() == wanted)
            .map(|(l, _)| l.clone())
    }

    /// The set member equal to `label`, or `other` when there is none.
    pub fn conform(&self, label: &Label) -> Label {
        self.resolve(label.as_str()).unwrap_or_else(Label::other)
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.defs.iter().any(|(l, _)| l == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.defs.iter().map(|(l, _)| l)
    }

    /// `(label, description)` pairs in configured order.
    pub fn definitions(&self) -> impl Iterator<Item = (&Label, &str)> {
        self.defs.iter().map(|(l, d)| (l, d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// GPU / AI market vocabulary used when no configuration overrides it.
    pub fn default_seed() -> Self {
        Self::from_defs(
            [
                (
                    "cloud_partnerships",
                    "AWS/Azure/GCP, partnerships, platform integrations",
                ),
                (
                    "ai_demand",
                    "demand, backlog, orders, capacity constraints, adoption",
                ),
                (
                    "infrastructure_expansion",
                    "datacenter buildouts, capex, factories, supply chain",
                ),
                (
                    "product_launch",
                    "launches/releases/announcements of GPUs, chips, platforms",
                ),
                (
                    "earnings",
                    "earnings, guidance, revenue, margins, quarterly results",
                ),
                (
                    "competition",
                    "AMD/Intel/other competitor positioning, comparisons",
                ),
                (
                    "regulation_export",
                    "export controls, sanctions, regulation, China policy",
                ),
                (
                    "datacenter_ai",
                    "AI training/inference workloads, accelerators in the datacenter",
                ),
                (OTHER, "none of the above"),
            ]
            .into_iter()
            .map(|(n, d)| LabelDef {
                name: n.to_string(),
                description: d.to_string(),
            }),
        )
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::default_seed()
    }
}
