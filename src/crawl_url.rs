use std::borrow::Cow;
use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// A parsed, absolute URL of a crawled page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlUrl {
    inner: Url,
}

impl CrawlUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        Url::parse(raw)
            .map(Self::from)
            .map_err(|source| Error::InvalidUrl {
                url: raw.to_string(),
                source,
            })
    }

    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.inner.host_str()
    }

    /// Explicit port if the URL has one, otherwise the scheme's well-known port.
    pub fn inferred_port(&self) -> Option<u16> {
        self.inner.port_or_known_default()
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    /// Path segments after the leading `/`. Empty segments (`/a//b`, `/a/`)
    /// are yielded as-is so positions stay stable.
    pub fn path_dirs(&self) -> impl Iterator<Item = &str> {
        self.inner.path().split('/').skip(1)
    }

    /// `scheme://host[:port]`, the key most per-site settings are stored under.
    pub fn site_url(&self) -> String {
        let origin = self.inner.origin();
        if origin.is_tuple() {
            origin.ascii_serialization()
        } else {
            self.inner.as_str().to_string()
        }
    }

    pub fn join(&self, reference: &str) -> Result<Self> {
        self.inner
            .join(reference)
            .map(Self::from)
            .map_err(|source| Error::InvalidUrl {
                url: reference.to_string(),
                source,
            })
    }

    pub fn as_url(&self) -> &Url {
        &self.inner
    }
}

impl From<Url> for CrawlUrl {
    fn from(inner: Url) -> Self {
        Self { inner }
    }
}

impl fmt::Display for CrawlUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.as_str())
    }
}

/// A URL as handed to the mapper: either already parsed or still raw text.
#[derive(Debug, Clone, Copy)]
pub enum UrlSource<'a> {
    Parsed(&'a CrawlUrl),
    Raw(&'a str),
}

impl<'a> UrlSource<'a> {
    /// Passes a parsed URL through untouched and parses a raw one.
    pub fn resolve(self) -> Result<Cow<'a, CrawlUrl>> {
        match self {
            UrlSource::Parsed(url) => Ok(Cow::Borrowed(url)),
            UrlSource::Raw(raw) => CrawlUrl::parse(raw).map(Cow::Owned),
        }
    }
}

impl<'a> From<&'a CrawlUrl> for UrlSource<'a> {
    fn from(url: &'a CrawlUrl) -> Self {
        UrlSource::Parsed(url)
    }
}

impl<'a> From<&'a str> for UrlSource<'a> {
    fn from(raw: &'a str) -> Self {
        UrlSource::Raw(raw)
    }
}
