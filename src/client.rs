//! Blocking HTTP client for the Matchday server.
//!
//! One logical actor drives requests at a time (the user navigating one menu
//! at a time), so I/O is synchronous and the client is single-threaded.
//! Collection and relation fetches go through the hypermedia pipeline:
//! fetch → decode [`Document`] → build entities → pair with the next cursor.

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::OnceCell;
use std::fmt;
use std::time::Duration;

use crate::build::{self, BuildError};
use crate::hal::{Document, Links};
use crate::{Competition, Event, Page, PageCursor, Team};

pub type ApiResult<T> = Result<T, ApiError>;

const USER_AGENT: &str = "matchday-api/0.1 (hypermedia browsing client)";
const DEFAULT_PORT: u16 = 8080;

/// A failed resource fetch. The absence of a value is always distinguishable
/// from a genuinely empty result: no path returns a silent default.
#[derive(Debug)]
pub enum FetchError {
    Network { url: String, source: reqwest::Error },
    Status { url: String, status: StatusCode },
    Parse { url: String, detail: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network { url, source } => write!(f, "network error for {url}: {source}"),
            FetchError::Status { url, status } => write!(f, "HTTP {status} for {url}"),
            FetchError::Parse { url, detail } => write!(f, "parse error for {url}: {detail}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Network { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Fetch(FetchError),
    Build(BuildError),
    NotFound(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Fetch(e) => write!(f, "{e}"),
            ApiError::Build(e) => write!(f, "{e}"),
            ApiError::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Fetch(e) => Some(e),
            ApiError::Build(e) => Some(e),
            ApiError::NotFound(_) => None,
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        ApiError::Fetch(e)
    }
}

impl From<BuildError> for ApiError {
    fn from(e: BuildError) -> Self {
        ApiError::Build(e)
    }
}

/// Server location as read from the host's settings store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ServerConfig {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self { address: address.into(), port }
    }

    /// Base URL with a normalized scheme; addresses entered without one
    /// default to plain http.
    pub fn base_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            format!("{}:{}", address, self.port)
        } else {
            format!("http://{}:{}", address, self.port)
        }
    }
}

/// Matchday server client. Fetches hypermedia documents and maps their
/// embedded records into domain entities.
#[derive(Debug, Clone)]
pub struct MatchdayApi {
    client: Client,
    base_url: String,
    timeout: Duration,
    roots: OnceCell<Links>,
}

impl MatchdayApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            base_url,
            timeout: Duration::from_secs(10),
            roots: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and decode a JSON resource. Accepts absolute http(s) URLs and
    /// root-relative hrefs. No retries; the caller decides how a failure
    /// surfaces.
    pub fn fetch_value(&self, url: &str) -> ApiResult<Value> {
        let url = self.absolute(url);
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .map_err(|source| FetchError::Network { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status }.into());
        }
        response
            .json::<Value>()
            .map_err(|e| FetchError::Parse { url, detail: e.to_string() }.into())
    }

    /// Fetch a resource and decode it as a hypermedia document.
    pub fn fetch_doc(&self, url: &str) -> ApiResult<Document> {
        let value = self.fetch_value(url)?;
        Document::from_value(value).map_err(|e| {
            FetchError::Parse { url: self.absolute(url), detail: e.to_string() }.into()
        })
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    pub fn competitions(&self, cursor: Option<&PageCursor>) -> ApiResult<Page<Competition>> {
        let url = self.page_url(cursor, "competitions")?;
        self.fetch_page(&url, "competitions", build::build_competition)
    }

    pub fn teams(&self, cursor: Option<&PageCursor>) -> ApiResult<Page<Team>> {
        let url = self.page_url(cursor, "teams")?;
        self.fetch_page(&url, "teams", build::build_team)
    }

    pub fn events(&self, cursor: Option<&PageCursor>) -> ApiResult<Page<Event>> {
        let url = self.page_url(cursor, "events")?;
        self.fetch_page(&url, "events", build::build_event)
    }

    /// Events featured on the root document. Servers without a
    /// `featuredEvents` block simply feature nothing.
    pub fn featured_events(&self) -> ApiResult<Vec<Event>> {
        let root = self.fetch_doc("/")?;
        let Some(featured) = root.sub_document("featuredEvents") else {
            debug!("root document has no featuredEvents block");
            return Ok(Vec::new());
        };
        featured
            .embedded("events")
            .iter()
            .map(|record| build::build_event(record).map_err(ApiError::from))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Relations — resolved strictly through the entity's own link map
    // -----------------------------------------------------------------------

    pub fn teams_of(&self, competition: &Competition) -> ApiResult<Page<Team>> {
        let url = Self::relation_href(&competition.links, "teams", &competition.name)?;
        self.fetch_page(&url, "teams", build::build_team)
    }

    pub fn events_of_competition(&self, competition: &Competition) -> ApiResult<Page<Event>> {
        let url = Self::relation_href(&competition.links, "events", &competition.name)?;
        self.fetch_page(&url, "events", build::build_event)
    }

    pub fn events_of_team(&self, team: &Team) -> ApiResult<Page<Event>> {
        let url = Self::relation_href(&team.links, "events", &team.name)?;
        self.fetch_page(&url, "events", build::build_event)
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn fetch_page<T>(
        &self,
        url: &str,
        kind: &str,
        build_record: impl Fn(&Value) -> Result<T, BuildError>,
    ) -> ApiResult<Page<T>> {
        let doc = self.fetch_doc(url)?;
        let items = doc
            .embedded(kind)
            .iter()
            .map(&build_record)
            .collect::<Result<Vec<T>, BuildError>>()?;
        debug!("fetched {} {kind} from {url}", items.len());
        Ok(Page { items, next: doc.next() })
    }

    /// Entry points are looked up by name on the root document, never
    /// hardcoded. The link map is cached per client instance; a failed root
    /// fetch leaves the cache empty so the next call re-fetches.
    fn root_href(&self, name: &str) -> ApiResult<String> {
        if self.roots.get().is_none() {
            let doc = self.fetch_doc("/")?;
            let _ = self.roots.set(doc.links().clone());
        }
        self.roots
            .get()
            .and_then(|links| links.href(name))
            .map(str::to_owned)
            .ok_or_else(|| ApiError::NotFound(format!("root document has no '{name}' link")))
    }

    fn page_url(&self, cursor: Option<&PageCursor>, root_link: &str) -> ApiResult<String> {
        match cursor {
            Some(cursor) => Ok(cursor.href.clone()),
            None => self.root_href(root_link),
        }
    }

    fn relation_href(links: &Links, name: &str, owner: &str) -> ApiResult<String> {
        links
            .href(name)
            .map(str::to_owned)
            .ok_or_else(|| ApiError::NotFound(format!("'{owner}' has no '{name}' link")))
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_owned()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}
