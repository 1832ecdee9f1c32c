// Rangeload - discovery.rs
//
// Boundary of the link-discovery collaborator: the piece that enumerates
// directory-listing-style links to feed into the download manager. Page
// retrieval itself lives behind the `LinkDiscovery` trait (a browser driver,
// a plain HTTP scraper, a fixture in tests); filtering, URL normalization and
// hook decoration are implemented here.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("page retrieval failed: {0}")]
    Retrieval(String),
}

/// One link found on a listing page, plus whatever attributes hooks attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub name: String,
    pub url: String,
    pub attributes: HashMap<String, String>,
}

impl DiscoveredLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        DiscoveredLink {
            name: name.into(),
            url: url.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Text filters applied to link names: a link passes when its name contains
/// every include term and none of the exclude terms.
#[derive(Debug, Default, Clone)]
pub struct LinkFilters {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl LinkFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, term: impl Into<String>) -> Self {
        self.include.push(term.into());
        self
    }

    pub fn exclude(mut self, term: impl Into<String>) -> Self {
        self.exclude.push(term.into());
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        self.include.iter().all(|term| name.contains(term.as_str()))
            && !self.exclude.iter().any(|term| name.contains(term.as_str()))
    }

    pub fn apply(&self, links: Vec<DiscoveredLink>) -> Vec<DiscoveredLink> {
        links
            .into_iter()
            .filter(|link| self.matches(&link.name))
            .collect()
    }
}

type LinkHook = Box<dyn Fn(&mut DiscoveredLink) + Send + Sync>;

/// Named per-link decoration callbacks, registered explicitly at construction
/// time and applied in registration order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<(String, LinkHook)>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&mut DiscoveredLink) + Send + Sync + 'static,
    {
        self.hooks.push((name.into(), Box::new(hook)));
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn decorate(&self, link: &mut DiscoveredLink) {
        for (_, hook) in &self.hooks {
            hook(link);
        }
    }

    pub fn decorate_all(&self, links: &mut [DiscoveredLink]) {
        for link in links {
            self.decorate(link);
        }
    }
}

/// Ensures a listing URL ends with a slash so relative hrefs join under it.
pub fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Resolves an href against its listing page; absolute links pass through.
pub fn resolve_link_url(base_url: &str, href: &str) -> Result<String, DiscoveryError> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }
    let base = Url::parse(&normalize_base_url(base_url))?;
    Ok(base.join(href)?.to_string())
}

/// The collaborator interface: lists links on a page, optionally narrowed by
/// a CSS selector. Consumed independently of the download core.
#[async_trait]
pub trait LinkDiscovery {
    async fn discover_links(
        &self,
        page_url: &str,
        selector: Option<&str>,
    ) -> Result<Vec<DiscoveredLink>, DiscoveryError>;
}
