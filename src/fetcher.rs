use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::crawl_result::HtmlCrawlResult;
use crate::crawl_url::CrawlUrl;

const USER_AGENT: &str = concat!("docmap/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw page as it came off the wire, before any parsing.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final url after redirects.
    pub url: CrawlUrl,
    pub start_time: DateTime<Utc>,
    pub html: String,
}

impl FetchedPage {
    pub fn into_crawl_result(self) -> HtmlCrawlResult {
        HtmlCrawlResult::new(self.url, &self.html).with_start_time(self.start_time)
    }
}

pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &CrawlUrl) -> Result<FetchedPage> {
        let start_time = Utc::now();
        let res = self
            .client
            .get(url.as_url().clone())
            .send()
            .await?
            .error_for_status()?;
        let final_url = CrawlUrl::from(res.url().clone());
        let html = res.text().await?;
        tracing::debug!(url = %final_url, bytes = html.len(), "fetched page");

        Ok(FetchedPage {
            url: final_url,
            start_time,
            html,
        })
    }
}
