//! # Source Weights
//!
//! Maps feed names (e.g. "NVIDIA Blog", "The Verge") to the weight each of
//! their headlines contributes to weighted momentum.
//!
//! - Loaded from the `[weights]` table of the pipeline config.
//! - Case-insensitive lookup with normalization of punctuation and dashes.
//! - Aliases map alternative spellings to canonical names.
//! - Lookup order: alias → exact match → default (1.0).

use serde::Deserialize;
use std::collections::HashMap;

fn default_default_weight() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceWeights {
    /// Weight for sources missing from `weights`.
    #[serde(default = "default_default_weight")]
    pub default_weight: f32,
    /// Weights for canonical source names.
    #[serde(default)]
    pub weights: HashMap<String, f32>,
    /// Non-canonical name → canonical name.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            default_weight: default_default_weight(),
            weights: HashMap::new(),
            aliases: HashMap::new(),
        }
    }
}

impl SourceWeights {
    /// Build from `(source, weight)` pairs with the default weight of 1.0.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        Self {
            weights: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..Self::default()
        }
    }

    /// Weight for a source name. Never negative.
    pub fn weight_for(&self, source: &str) -> f32 {
        let s = normalize(source);

        if let Some(canon) = self
            .aliases
            .iter()
            .find(|(a, _)| normalize(a) == s)
            .map(|(_, c)| normalize(c))
        {
            if let Some(w) = self.lookup(&canon) {
                return w;
            }
        }

        if let Some(w) = self.lookup(&s) {
            return w;
        }

        self.default_weight.max(0.0)
    }

    fn lookup(&self, normalized: &str) -> Option<f32> {
        self.weights
            .iter()
            .find(|(k, _)| normalize(k) == normalized)
            .map(|(_, &w)| w.max(0.0))
    }
}

/// Lowercase, replace punctuation and dashes with spaces, collapse spaces.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_lowercase();

    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }
    out = out.replace(['\n', '\r', '\t', '.', ',', '’', '\''], " ");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
