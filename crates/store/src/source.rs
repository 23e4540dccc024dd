//! Root document transports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use rewardcraft_core::{encode_hash, Hash, Result, RewardsError, RootDocument};

/// Pluggable source of published root documents.
#[async_trait]
pub trait RootSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Fetch the most recently computed root document.
    async fn fetch_latest(&self) -> Result<RootDocument>;

    /// Fetch the document for `root`. Missing documents are `RootNotFound`.
    async fn fetch_root(&self, root: &Hash) -> Result<RootDocument>;
}

/// Fetches `{base}/latest.json` and `{base}/{root}.json` over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpRootSource {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRootSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Build with a request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RewardsError::InvalidInput(format!("http client: {e}")))?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}.json", self.base_url.trim_end_matches('/'), name)
    }

    /// GET `url`; `Ok(None)` on 404 so each caller decides what missing means.
    async fn get_document(&self, url: &str) -> Result<Option<RootDocument>> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RewardsError::DataUnavailable(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RewardsError::DataUnavailable(format!(
                "HTTP {} from {url}",
                status.as_u16()
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| RewardsError::DataUnavailable(format!("reading {url} failed: {e}")))?;
        RootDocument::from_json(&body).map(Some)
    }
}

#[async_trait]
impl RootSource for HttpRootSource {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch_latest(&self) -> Result<RootDocument> {
        let url = self.url("latest");
        self.get_document(&url)
            .await?
            .ok_or_else(|| RewardsError::DataUnavailable(format!("HTTP 404 from {url}")))
    }

    async fn fetch_root(&self, root: &Hash) -> Result<RootDocument> {
        let url = self.url(&encode_hash(root));
        self.get_document(&url)
            .await?
            .ok_or_else(|| RewardsError::RootNotFound(encode_hash(root)))
    }
}

#[derive(Debug, Default)]
struct StaticState {
    latest: Option<Hash>,
    documents: HashMap<Hash, RootDocument>,
    fail_with: Option<RewardsError>,
}

/// In-memory source for tests and offline use.
///
/// Counts fetches so callers can observe caching.
#[derive(Debug, Default)]
pub struct StaticRootSource {
    state: RwLock<StaticState>,
    fetches: AtomicUsize,
}

impl StaticRootSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document and make it the latest.
    pub fn publish(&self, document: RootDocument) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.latest = Some(document.root);
        state.documents.insert(document.root, document);
    }

    /// Add a historical document without moving the latest pointer.
    pub fn insert(&self, document: RootDocument) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.documents.insert(document.root, document);
    }

    /// Make every fetch fail with `err` until cleared with `None`.
    pub fn set_failure(&self, err: Option<RewardsError>) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).fail_with = err;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RootSource for StaticRootSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn fetch_latest(&self) -> Result<RootDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if let Some(err) = &state.fail_with {
            return Err(err.clone());
        }
        state
            .latest
            .and_then(|root| state.documents.get(&root).cloned())
            .ok_or_else(|| RewardsError::DataUnavailable("no latest root published".to_string()))
    }

    async fn fetch_root(&self, root: &Hash) -> Result<RootDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if let Some(err) = &state.fail_with {
            return Err(err.clone());
        }
        state
            .documents
            .get(root)
            .cloned()
            .ok_or_else(|| RewardsError::RootNotFound(encode_hash(root)))
    }
}
