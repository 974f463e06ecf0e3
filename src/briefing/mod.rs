//! # Briefing composer
//!
//! Single pass: recent window → tag snapshot + headline digest → narrative
//! model call → [`Briefing`], rendered to markdown by [`render_markdown`].

pub mod digest;
pub mod narrative;
pub mod render;

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::aggregate::{count_by_tag, select_recent, TagTotals};
use crate::config::{BriefingConfig, ConfigError};
use crate::llm::LlmClient;
use crate::record::SignalRecord;

pub use digest::{format_digest, DigestShape};
pub use narrative::{narrative_instructions, parse_narrative, Narrative};
pub use render::render_markdown;

/// Briefing cadence; selects the window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Daily,
    Weekly,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Daily => "daily",
            Mode::Weekly => "weekly",
        }
    }

    pub fn window_days(self) -> u32 {
        match self {
            Mode::Daily => 1,
            Mode::Weekly => 7,
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Mode::Daily),
            "weekly" => Ok(Mode::Weekly),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the rendered document shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Briefing {
    pub mode: Mode,
    pub window_days: u32,
    pub snapshot: TagTotals<usize>,
    pub narrative: Narrative,
    /// Headline digest sent to the model, reproduced verbatim in the document.
    pub digest: String,
}

/// Compose a briefing over the mode's window. `None` when the window holds
/// no records. A failed or unparseable model answer degrades to placeholder
/// sections instead of failing.
pub async fn compose_briefing(
    records: &[SignalRecord],
    mode: Mode,
    client: &dyn LlmClient,
    cfg: &BriefingConfig,
) -> Option<Briefing> {
    let window_days = mode.window_days();
    let recent = select_recent(records, window_days, None);
    if recent.is_empty() {
        return None;
    }

    let snapshot = count_by_tag(&recent).top(cfg.snapshot_tags);
    let digest = format_digest(&recent, cfg.digest_shape());
    let input = format!("Headlines grouped by tag:\n{digest}");

    info!(
        target: "briefing",
        mode = mode.as_str(),
        records = recent.len(),
        tags = snapshot.len(),
        "requesting narrative"
    );
    let narrative = match client.complete(&narrative_instructions(mode), &input).await {
        Ok(text) => parse_narrative(&text),
        Err(e) => {
            warn!(target: "briefing", error = %e, "narrative call failed");
            Narrative::degraded(&format!("error:{}", e.kind()))
        }
    };

    Some(Briefing {
        mode,
        window_days,
        snapshot,
        narrative,
        digest,
    })
}
