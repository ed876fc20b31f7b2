//! Academic paper search

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, Tool};
use crate::{Error, Result};

const ARXIV_API: &str = "http://export.arxiv.org/api/query";

/// Results returned to the model per search
pub const MAX_RESULTS: usize = 2;

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub title: String,
    pub summary: String,
}

/// Keyword search over a paper collection
#[async_trait]
pub trait PaperIndex: Send + Sync {
    /// Up to `max_results` papers, most relevant first
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>>;
}

/// The public arXiv query API
pub struct ArxivIndex {
    base_url: String,
    http_client: reqwest::Client,
}

impl ArxivIndex {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: ARXIV_API.to_string(),
            http_client,
        })
    }

    /// Point at a different query endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PaperIndex for ArxivIndex {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let search_query = format!("all:{}", query);
        let max_results = max_results.to_string();

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
            ])
            .send()
            .await
            .map_err(|e| Error::Other(format!("arXiv request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Other(format!("arXiv returned {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Other(format!("arXiv response unreadable: {}", e)))?;
        Ok(parse_atom(&body))
    }
}

/// Pull title and summary out of each `<entry>` of an Atom feed
fn parse_atom(feed: &str) -> Vec<Paper> {
    let mut papers = Vec::new();
    let mut rest = feed;

    while let Some(start) = rest.find("<entry") {
        let after = &rest[start..];
        let Some(end) = after.find("</entry>") else {
            break;
        };
        let entry = &after[..end];
        if let (Some(title), Some(summary)) = (tag_text(entry, "title"), tag_text(entry, "summary"))
        {
            papers.push(Paper {
                title: collapse(&element_text(title)),
                summary: collapse(&element_text(summary)),
            });
        }
        rest = &after[end + "</entry>".len()..];
    }

    papers
}

fn tag_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut search_from = 0;
    loop {
        let start = search_from + xml[search_from..].find(&open)?;
        let after_name = start + open.len();
        // Skip longer tag names sharing the prefix.
        match xml[after_name..].chars().next() {
            Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                let body_start = after_name + xml[after_name..].find('>')? + 1;
                let body_len = xml[body_start..].find(&close)?;
                return Some(&xml[body_start..body_start + body_len]);
            }
            _ => search_from = after_name,
        }
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Named and numeric character references
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9A-Fa-f]+)|(lt|gt|quot|apos|amp));")
        .expect("entity pattern is valid")
});

/// Text of an element body: a CDATA section verbatim, otherwise unescaped
fn element_text(body: &str) -> String {
    let trimmed = body.trim();
    if let Some(raw) = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        return raw.to_string();
    }
    unescape(body)
}

fn unescape(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let code = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok()
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok()
            } else {
                return match &caps[3] {
                    "lt" => "<",
                    "gt" => ">",
                    "quot" => "\"",
                    "apos" => "'",
                    _ => "&",
                }
                .to_string();
            };
            // Invalid code points stay as written
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

/// `search_arxiv`: titles and summaries of the best matching papers
pub struct SearchPapersTool {
    index: Arc<dyn PaperIndex>,
}

impl SearchPapersTool {
    pub fn new(index: Arc<dyn PaperIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for SearchPapersTool {
    fn name(&self) -> &'static str {
        "search_arxiv"
    }

    fn description(&self) -> &'static str {
        "Search arXiv for papers matching the query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search keywords"}
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> String {
        let args: SearchArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(e) => return e,
        };

        let papers = match self.index.search(&args.query, MAX_RESULTS).await {
            Ok(papers) => papers,
            Err(e) => {
                tracing::warn!(query = %args.query, error = %e, "Paper search failed");
                return format!("Paper search failed: {}", e);
            }
        };

        if papers.is_empty() {
            return "No results found.".to_string();
        }

        papers
            .iter()
            .take(MAX_RESULTS)
            .map(|paper| format!("Title: {}\nSummary: {}", paper.title, paper.summary))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
