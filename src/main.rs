use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::Parser;
use futures::{StreamExt, stream};
use tracing_subscriber::EnvFilter;

use docmap::crawl_url::CrawlUrl;
use docmap::fetcher::Fetcher;
use docmap::{Config, Document, DocumentMapper, HtmlCrawlResult};

/// Map crawled pages into flat, indexable JSON documents.
#[derive(Debug, Parser)]
#[command(name = "docmap", version)]
struct Args {
    /// Page URLs to map.
    #[arg(required = true)]
    urls: Vec<String>,

    /// Map this local HTML file instead of fetching (exactly one URL).
    #[arg(long)]
    html: Option<PathBuf>,

    /// Extraction rules JSON, overrides DOCMAP_EXTRACTION_RULES.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Pages fetched at the same time.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Also picks up `log` records through tracing-subscriber's log bridge.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::load(args.rules.as_deref()).context("Failed to load configuration")?;
    let mapper = DocumentMapper::new(Arc::new(config));

    if let Some(path) = &args.html {
        let [url] = args.urls.as_slice() else {
            bail!("--html maps exactly one url, got {}", args.urls.len());
        };
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let result = HtmlCrawlResult::parse(url, &html)?.with_start_time(Utc::now());
        let document = mapper.document_fields(&result)?;
        return print_document(&document, args.pretty);
    }

    let fetcher = Fetcher::new()?;
    let mut documents = stream::iter(&args.urls)
        .map(|url| map_remote_page(&fetcher, &mapper, url))
        .buffer_unordered(args.concurrency.max(1));

    let mut failed = 0;
    while let Some(result) = documents.next().await {
        match result {
            Ok(document) => print_document(&document, args.pretty)?,
            Err(e) => {
                failed += 1;
                log::error!("{:#}", e);
            }
        }
    }
    if failed > 0 {
        log::warn!("{failed} of {} pages could not be mapped", args.urls.len());
    }
    Ok(())
}

async fn map_remote_page(
    fetcher: &Fetcher,
    mapper: &DocumentMapper,
    url: &str,
) -> anyhow::Result<Document> {
    let url = CrawlUrl::parse(url)?;
    let page = fetcher
        .fetch(&url)
        .await
        .with_context(|| format!("error fetching page {url}"))?;
    let result = page.into_crawl_result();
    mapper
        .document_fields(&result)
        .with_context(|| format!("error mapping page {url}"))
}

fn print_document(document: &Document, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    println!("{json}");
    Ok(())
}
