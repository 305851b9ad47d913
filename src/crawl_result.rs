use std::collections::HashSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use crate::crawl_url::{CrawlUrl, UrlSource};
use crate::error::Result;

static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("body"));
static BASE: Lazy<Selector> = Lazy::new(|| selector("base[href]"));
static META: Lazy<Selector> = Lazy::new(|| selector("meta[name]"));
static ANCHORS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static HEADINGS: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3, h4, h5, h6"));

/// Elements whose text never makes it into indexed content.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("built-in selectors are valid CSS")
}

/// One fetched page, as seen by the document mapper.
///
/// Text accessors take a byte limit, list accessors an item count; the
/// implementation does the truncating. "Nothing found" is an empty value.
pub trait CrawlResult {
    fn url(&self) -> UrlSource<'_>;
    fn base_url(&self) -> String;
    fn site_url(&self) -> String;
    fn start_time(&self) -> Option<DateTime<Utc>>;

    fn document_title(&self, limit: usize) -> String;
    fn document_body(&self, limit: usize) -> String;
    fn meta_keywords(&self, limit: usize) -> String;
    fn meta_description(&self, limit: usize) -> String;
    fn links(&self, limit: usize) -> Vec<String>;
    fn headings(&self, limit: usize) -> Vec<String>;
}

/// A crawl result backed by a parsed HTML document.
///
/// `scraper::Html` is not `Send`, so build and map these on the worker that fetched the page.
pub struct HtmlCrawlResult {
    url: CrawlUrl,
    base_url: CrawlUrl,
    start_time: Option<DateTime<Utc>>,
    document: Html,
}

impl HtmlCrawlResult {
    pub fn new(url: CrawlUrl, html: &str) -> Self {
        let document = Html::parse_document(html);
        let base_url = document
            .select(&BASE)
            .next()
            .and_then(|base| base.value().attr("href"))
            .and_then(|href| url.join(href.trim()).ok())
            .unwrap_or_else(|| url.clone());

        Self {
            url,
            base_url,
            start_time: None,
            document,
        }
    }

    pub fn parse(url: &str, html: &str) -> Result<Self> {
        Ok(Self::new(CrawlUrl::parse(url)?, html))
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    fn meta_content(&self, name: &str) -> Option<&str> {
        self.document
            .select(&META)
            .find(|meta| {
                meta.value()
                    .attr("name")
                    .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
            })
            .and_then(|meta| meta.value().attr("content"))
    }
}

impl CrawlResult for HtmlCrawlResult {
    fn url(&self) -> UrlSource<'_> {
        UrlSource::Parsed(&self.url)
    }

    fn base_url(&self) -> String {
        self.base_url.to_string()
    }

    fn site_url(&self) -> String {
        self.url.site_url()
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    fn document_title(&self, limit: usize) -> String {
        let title = self
            .document
            .select(&TITLE)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .unwrap_or_default();
        truncate_utf8(&title, limit)
    }

    fn document_body(&self, limit: usize) -> String {
        let body = self
            .document
            .select(&BODY)
            .next()
            .map(visible_text)
            .unwrap_or_default();
        truncate_utf8(&body, limit)
    }

    fn meta_keywords(&self, limit: usize) -> String {
        let keywords = self.meta_content("keywords").unwrap_or_default();
        truncate_utf8(&collapse_whitespace(keywords), limit)
    }

    fn meta_description(&self, limit: usize) -> String {
        let description = self.meta_content("description").unwrap_or_default();
        truncate_utf8(&collapse_whitespace(description), limit)
    }

    fn links(&self, limit: usize) -> Vec<String> {
        let base = self.base_url.as_url();
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in self.document.select(&ANCHORS) {
            if links.len() >= limit {
                break;
            }
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            // Both point back at the page itself.
            if href.is_empty() || href.starts_with('#') {
                continue;
            }
            let Ok(mut resolved) = base.join(href) else {
                continue;
            };
            if resolved.scheme() != "http" && resolved.scheme() != "https" {
                continue;
            }
            resolved.set_fragment(None);
            let resolved = resolved.to_string();
            if seen.insert(resolved.clone()) {
                links.push(resolved);
            }
        }
        links
    }

    fn headings(&self, limit: usize) -> Vec<String> {
        self.document
            .select(&HEADINGS)
            .map(|h| collapse_whitespace(&h.text().collect::<String>()))
            .filter(|h| !h.is_empty())
            .take(limit)
            .collect()
    }
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(el) => HIDDEN_ELEMENTS.contains(&el.name()),
            _ => false,
        });
        if !hidden {
            text.push_str(chunk);
            text.push(' ');
        }
    }
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `max_bytes`, backing off to the previous char boundary.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].trim_end().to_string()
}
