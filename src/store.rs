//! Tabular record files (CSV with header).
//!
//! Two column layouts share one reader:
//! - tagged:     `published_at,source,title,url,tag`
//! - classified: tagged + `ai_label,ai_confidence,ai_reason,final_tag`

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use serde::Deserialize;

use crate::labels::Label;
use crate::record::{parse_timestamp, SignalRecord};

const TAGGED_HEADER: [&str; 5] = ["published_at", "source", "title", "url", "tag"];
const CLASSIFIED_EXTRA: [&str; 4] = ["ai_label", "ai_confidence", "ai_reason", "final_tag"];

/// Column layout to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Tagged,
    Classified,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    ai_label: String,
    #[serde(default)]
    ai_confidence: String,
    #[serde(default)]
    ai_reason: String,
    #[serde(default)]
    final_tag: String,
}

impl Row {
    fn into_record(self) -> SignalRecord {
        let tag = Label::new(&self.tag);
        let final_tag = if self.final_tag.trim().is_empty() {
            tag.clone()
        } else {
            Label::new(&self.final_tag)
        };
        let ai_label = if self.ai_label.trim().is_empty() {
            None
        } else {
            Some(Label::new(&self.ai_label))
        };
        SignalRecord {
            published_at: parse_timestamp(&self.published_at),
            source: self.source,
            title: self.title,
            url: self.url,
            tag,
            ai_label,
            ai_confidence: self.ai_confidence.trim().parse::<f32>().unwrap_or(0.0),
            ai_reason: self.ai_reason,
            final_tag,
        }
    }
}

/// Read records from any CSV source with a header row.
pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<SignalRecord>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut out = Vec::new();
    for (i, row) in rdr.deserialize::<Row>().enumerate() {
        let row = row.with_context(|| format!("decoding record row {}", i + 1))?;
        out.push(row.into_record());
    }
    Ok(out)
}

pub fn read_records(path: &Path) -> Result<Vec<SignalRecord>> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_records_from(file).with_context(|| format!("reading {}", path.display()))
}

/// Write records with a header row in the given layout.
pub fn write_records_to<W: Write>(writer: W, records: &[SignalRecord], schema: Schema) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = TAGGED_HEADER.to_vec();
    if schema == Schema::Classified {
        header.extend(CLASSIFIED_EXTRA);
    }
    wtr.write_record(&header)?;

    for r in records {
        let mut row: Vec<String> = vec![
            r.published_at
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, false))
                .unwrap_or_default(),
            r.source.clone(),
            r.title.clone(),
            r.url.clone(),
            r.tag.to_string(),
        ];
        if schema == Schema::Classified {
            row.push(r.ai_label.as_ref().map(Label::to_string).unwrap_or_default());
            row.push(r.ai_confidence.to_string());
            row.push(r.ai_reason.clone());
            row.push(r.final_tag.to_string());
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write to `path`, creating the parent directory if needed.
pub fn write_records(path: &Path, records: &[SignalRecord], schema: Schema) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_records_to(file, records, schema).with_context(|| format!("writing {}", path.display()))
}
