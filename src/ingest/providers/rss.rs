use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{FeedSource, RawEntry};

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    text: String,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) wins over other links.
    fn best_link(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.clone())
    }
}

/// Parse an RSS 2.0 or Atom document into raw entries.
pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let out: Vec<RawEntry> = if xml_clean.contains("<rss") {
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        rss.channel
            .items
            .into_iter()
            .map(|it| RawEntry {
                title: it.title,
                link: it.link,
                published: it.pub_date,
                updated: None,
            })
            .collect()
    } else if xml_clean.contains("<feed") {
        let feed: AtomFeed = from_str(&xml_clean).context("parsing atom xml")?;
        feed.entries
            .into_iter()
            .map(|e| RawEntry {
                link: e.best_link(),
                title: e.title.map(|t| t.text),
                published: e.published,
                updated: e.updated,
            })
            .collect()
    } else {
        bail!("document is neither RSS nor Atom");
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(out)
}

/// Feed provider backed by a URL or by an in-memory document.
pub struct RssFeed {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeed {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(name: &str, url: &str, client: reqwest::Client) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }
}

#[async_trait]
impl FeedSource for RssFeed {
    async fn fetch_entries(&self) -> Result<Vec<RawEntry>> {
        match &self.mode {
            Mode::Fixture(s) => parse_feed(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?
                    .error_for_status()
                    .with_context(|| format!("GET {url}"))?
                    .text()
                    .await
                    .with_context(|| format!("reading body of {url}"))?;
                parse_feed(&body).with_context(|| format!("feed {}", self.name))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Replace HTML entities that are not defined in XML and would abort parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_items_are_read_in_order() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
<item><title>First&nbsp;one</title><link>https://a/1</link><pubDate>Sat, 01 Mar 2025 12:00:00 GMT</pubDate></item>
<item><title>Second</title><link>https://a/2</link></item>
</channel></rss>"#;
        let entries = parse_feed(xml).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("First one"));
        assert_eq!(entries[1].published, None);
    }

    #[test]
    fn atom_entries_use_alternate_link() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>V</title>
<entry>
  <title type="html">Chip news</title>
  <link rel="replies" href="https://v/comments"/>
  <link rel="alternate" type="text/html" href="https://v/story"/>
  <updated>2025-03-01T12:00:00-05:00</updated>
</entry>
</feed>"#;
        let entries = parse_feed(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title.as_deref(), Some("Chip news"));
        assert_eq!(entries[0].link.as_deref(), Some("https://v/story"));
        assert!(entries[0].published.is_none());
        assert!(entries[0].updated.is_some());
    }

    #[test]
    fn atom_links_need_not_be_adjacent() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
<entry>
  <link rel="alternate" href="https://v/story"/>
  <id>tag:v,2025:1</id>
  <updated>2025-03-01T12:00:00Z</updated>
  <link rel="replies" href="https://v/story#comments"/>
  <title>Split links</title>
</entry>
</feed>"#;
        let entries = parse_feed(xml).unwrap();
        assert_eq!(entries[0].link.as_deref(), Some("https://v/story"));
        assert_eq!(entries[0].title.as_deref(), Some("Split links"));
    }

    #[test]
    fn unknown_document_is_an_error() {
        assert!(parse_feed("<html><body/></html>").is_err());
    }
}
