// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod briefing;
pub mod chart;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod json_extract;
pub mod labels;
pub mod llm;
pub mod pipeline;
pub mod record;
pub mod source_weights;
pub mod store;
pub mod tagger;

// ---- Re-exports for the common entry points ----
pub use crate::briefing::Mode;
pub use crate::config::{ConfigError, PipelineConfig};
pub use crate::labels::{Label, LabelSet};
pub use crate::record::SignalRecord;
