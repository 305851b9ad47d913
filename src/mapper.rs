use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::crawl_result::CrawlResult;
use crate::crawl_url::UrlSource;
use crate::data_models::{Document, ExtractionRule, Field, FieldValue};
use crate::error::Result;

/// Turns crawl results into indexable documents.
///
/// Holds nothing but the read-only job config, so one mapper can be shared
/// across crawl workers.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    config: Arc<Config>,
}

/// Rules picked for a page, and the site key they were found under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRules<'a> {
    pub site: &'a str,
    pub rules: &'a [ExtractionRule],
}

impl DocumentMapper {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Maps one crawl result into its final document.
    ///
    /// Content, URL and rule fields are merged in that order. Fails only if
    /// the result's URL does not parse.
    pub fn document_fields<R: CrawlResult + ?Sized>(&self, crawl_result: &R) -> Result<Document> {
        let main = self.main_components(crawl_result);
        let url = self.url_components(crawl_result.url())?;
        let rules = self.rule_components(crawl_result);
        Ok(main.merge(url).merge(rules))
    }

    pub fn main_components<R: CrawlResult + ?Sized>(&self, crawl_result: &R) -> Document {
        let config = &self.config;
        Document::from_fields([
            (
                Field::Title,
                Some(crawl_result.document_title(config.max_title_size).into()),
            ),
            (
                Field::BodyContent,
                Some(crawl_result.document_body(config.max_body_size).into()),
            ),
            (
                Field::MetaKeywords,
                Some(crawl_result.meta_keywords(config.max_keywords_size).into()),
            ),
            (
                Field::MetaDescription,
                Some(crawl_result.meta_description(config.max_description_size).into()),
            ),
            (
                Field::Links,
                Some(crawl_result.links(config.max_indexed_links_count).into()),
            ),
            (
                Field::Headings,
                Some(crawl_result.headings(config.max_headings_count).into()),
            ),
            (
                Field::LastCrawledAt,
                crawl_result.start_time().map(Into::into),
            ),
        ])
    }

    /// Splits a URL into the `url*` fields. Raw strings are parsed first and
    /// a parse failure is returned as is.
    pub fn url_components<'a>(&self, url: impl Into<UrlSource<'a>>) -> Result<Document> {
        let url = url.into().resolve()?;
        let mut dirs = url.path_dirs();

        let mut fields: Vec<(Field, Option<FieldValue>)> = vec![
            (Field::Url, Some(url.as_str().into())),
            (Field::UrlScheme, Some(url.scheme().into())),
            (Field::UrlHost, url.host().map(Into::into)),
            (
                Field::UrlPort,
                url.inferred_port().map(|port| port.to_string().into()),
            ),
            (Field::UrlPath, Some(url.path().into())),
        ];
        for field in Field::URL_PATH_DIRS {
            fields.push((field, dirs.next().map(Into::into)));
        }

        Ok(Document::from_fields(fields))
    }

    /// Finds the extraction rules configured for this page's site.
    ///
    /// Keys are tried in order: base url, site url, host. The first key with
    /// an entry wins, even if its rule list is empty.
    pub fn resolve_extraction_rules<R: CrawlResult + ?Sized>(
        &self,
        crawl_result: &R,
    ) -> Option<ResolvedRules<'_>> {
        let host = crawl_result
            .url()
            .resolve()
            .ok()
            .and_then(|url| url.host().map(str::to_string));

        [Some(crawl_result.base_url()), Some(crawl_result.site_url()), host]
            .into_iter()
            .flatten()
            .find_map(|key| {
                self.config
                    .rules_for(&key)
                    .map(|(site, rules)| ResolvedRules { site, rules })
            })
    }

    /// Fields produced by per-site extraction rules.
    ///
    /// Rules are resolved and reported but not applied yet, so this is always
    /// empty. Custom fields attach here without touching the fixed schema.
    pub fn rule_components<R: CrawlResult + ?Sized>(&self, crawl_result: &R) -> Document {
        match self.resolve_extraction_rules(crawl_result) {
            Some(resolved) => {
                info!(
                    site = resolved.site,
                    rules = resolved.rules.len(),
                    "found extraction rules"
                );
                for rule in resolved.rules {
                    debug!(
                        site = resolved.site,
                        field = %rule.field_name,
                        selector = %rule.selector,
                        action = ?rule.action,
                        "extraction rule"
                    );
                }
            }
            None => {
                debug!(
                    base_url = %crawl_result.base_url(),
                    site_url = %crawl_result.site_url(),
                    "no extraction rules configured"
                );
            }
        }
        Document::new()
    }
}
