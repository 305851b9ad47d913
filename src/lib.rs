pub mod config;
pub mod crawl_result;
pub mod crawl_url;
pub mod data_models;
pub mod error;
pub mod fetcher;
pub mod mapper;

pub use config::Config;
pub use crawl_result::{CrawlResult, HtmlCrawlResult};
pub use crawl_url::{CrawlUrl, UrlSource};
pub use data_models::{Document, ExtractionRule, Field, FieldValue};
pub use error::{Error, Result};
pub use mapper::DocumentMapper;
