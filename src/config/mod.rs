//! Pipeline configuration (`config/pipeline.toml`).
//!
//! Every section is optional; a missing default file means built-in defaults.
//! `SIGNALS_CONFIG_PATH` overrides the location and must then exist.

pub mod llm;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::briefing::DigestShape;
use crate::labels::{LabelDef, LabelSet};
use crate::source_weights::SourceWeights;
use crate::tagger::{default_groups, KeywordGroup, KeywordTagger};

pub use llm::LlmConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_CONFIG_PATH: &str = "SIGNALS_CONFIG_PATH";

/// Fatal configuration problems, raised before any pipeline work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; export it or add it to .env")]
    MissingCredential(&'static str),

    #[error("unsupported LLM provider in config: {0}")]
    UnsupportedProvider(String),

    #[error("building HTTP client: {0}")]
    HttpClient(String),

    #[error("label `{0}` is not part of the configured label set")]
    UnknownLabel(String),

    #[error("unknown briefing mode `{0}` (expected daily or weekly)")]
    InvalidMode(String),

    #[error("SIGNALS_CONFIG_PATH points to a non-existent path: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("reading config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_max_entries() -> usize {
    50
}
fn default_min_confidence() -> f32 {
    0.60
}
fn default_pacing_ms() -> u64 {
    100
}
fn default_reason_max_chars() -> usize {
    80
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl PathsConfig {
    /// Output of the fetch stage.
    pub fn signals(&self) -> PathBuf {
        self.data_dir.join("signals.csv")
    }
    /// Output of the classify stage.
    pub fn signals_ai(&self) -> PathBuf {
        self.data_dir.join("signals_ai.csv")
    }
    pub fn briefing(&self, mode: crate::briefing::Mode) -> PathBuf {
        self.data_dir.join(format!("briefing_{}.md", mode.as_str()))
    }
    pub fn chart(&self) -> PathBuf {
        self.data_dir.join("tag_counts.svg")
    }
    /// The classified file when present, else the tagged one.
    pub fn briefing_input(&self) -> PathBuf {
        let ai = self.signals_ai();
        if ai.exists() {
            ai
        } else {
            self.signals()
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig {
            name: "NVIDIA Blog".into(),
            url: "https://blogs.nvidia.com/feed/".into(),
        },
        FeedConfig {
            name: "The Verge".into(),
            url: "https://www.theverge.com/rss/index.xml".into(),
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Entries kept per feed, newest-first as the feed lists them.
    #[serde(default = "default_max_entries")]
    pub max_entries_per_feed: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_entries_per_feed: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaggerConfig {
    #[serde(default)]
    pub groups: Vec<KeywordGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Promotion threshold (inclusive).
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// Delay between consecutive classification calls.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default = "default_reason_max_chars")]
    pub reason_max_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            pacing_ms: default_pacing_ms(),
            reason_max_chars: default_reason_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BriefingConfig {
    #[serde(default = "BriefingConfig::default_digest_tags")]
    pub digest_tags: usize,
    #[serde(default = "BriefingConfig::default_headlines_per_tag")]
    pub headlines_per_tag: usize,
    #[serde(default = "BriefingConfig::default_snapshot_tags")]
    pub snapshot_tags: usize,
}

impl BriefingConfig {
    fn default_digest_tags() -> usize {
        4
    }
    fn default_headlines_per_tag() -> usize {
        4
    }
    fn default_snapshot_tags() -> usize {
        10
    }

    pub fn digest_shape(&self) -> DigestShape {
        DigestShape {
            top_tags: self.digest_tags,
            headlines_per_tag: self.headlines_per_tag,
        }
    }
}

impl Default for BriefingConfig {
    fn default() -> Self {
        Self {
            digest_tags: Self::default_digest_tags(),
            headlines_per_tag: Self::default_headlines_per_tag(),
            snapshot_tags: Self::default_snapshot_tags(),
        }
    }
}

/// Whole `pipeline.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub labels: Vec<LabelDef>,
    #[serde(default)]
    pub tagger: TaggerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub briefing: BriefingConfig,
    #[serde(default)]
    pub weights: SourceWeights,
}

impl PipelineConfig {
    /// Parse TOML text and fill in defaults for empty lists.
    pub fn from_toml_str(s: &str, origin: &Path) -> Result<Self, ConfigError> {
        let cfg: PipelineConfig = toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data, path)
    }

    /// `$SIGNALS_CONFIG_PATH`, then `config/pipeline.toml`, then built-in defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ConfigError::MissingFile(pb));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        Ok(Self::default().sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self.feeds.is_empty() {
            self.feeds = default_feeds();
        }
        if self.tagger.groups.is_empty() {
            self.tagger.groups = default_groups();
        }
        if !(0.0..=1.0).contains(&self.classifier.min_confidence) {
            self.classifier.min_confidence = default_min_confidence();
        }
        if self.ingest.max_entries_per_feed == 0 {
            self.ingest.max_entries_per_feed = default_max_entries();
        }
        self
    }

    /// Configured labels, or the built-in GPU vocabulary when none are listed.
    pub fn label_set(&self) -> LabelSet {
        if self.labels.is_empty() {
            LabelSet::default_seed()
        } else {
            LabelSet::from_defs(self.labels.iter().cloned())
        }
    }

    pub fn tagger(&self) -> Result<KeywordTagger, ConfigError> {
        KeywordTagger::new(&self.tagger.groups, &self.label_set())
    }
}
