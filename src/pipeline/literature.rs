//! Recent-literature lookup in PubMed through NCBI E-utilities.
//!
//! Two calls in sequence: `esearch` for the newest matching ids, then
//! `efetch` for their abstracts as plain text. The search is advisory: an
//! empty id list becomes the configured sentinel, and any failure becomes a
//! `PubMed API connection error: …` string. Neither ever aborts a run, and
//! there is no retry.
//!
//! [`LiteratureSource`] is the seam between the query policy
//! ([`LiteratureSearcher`]) and the wire ([`PubMedClient`]).

use crate::config::ReviewConfig;
use crate::error::ReviewError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// `tool` parameter sent with every E-utilities request.
pub const TOOL_NAME: &str = "manuscript-review";

/// Failure of one E-utilities call.
#[derive(Debug, Error)]
pub enum LiteratureError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Remote(String),
}

/// A bibliographic database that can search ids and fetch abstracts.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Newest-first ids matching `term`, at most `max_results`.
    async fn search_ids(
        &self,
        term: &str,
        max_results: usize,
    ) -> Result<Vec<String>, LiteratureError>;

    /// Abstracts for `ids` as raw text.
    async fn fetch_abstracts(&self, ids: &[String]) -> Result<String, LiteratureError>;
}

// ── E-utilities client ───────────────────────────────────────────────────

/// PubMed over E-utilities.
pub struct PubMedClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

impl PubMedClient {
    pub fn new(base_url: &str, email: &str, timeout_secs: u64) -> Result<Self, ReviewError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReviewError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
        })
    }

    pub fn from_config(config: &ReviewConfig) -> Result<Self, ReviewError> {
        Self::new(
            &config.literature_base_url,
            &config.contact_email,
            config.api_timeout_secs,
        )
    }

    async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, LiteratureError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("email", self.email.as_str()), ("tool", TOOL_NAME)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LiteratureError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    async fn search_ids(
        &self,
        term: &str,
        max_results: usize,
    ) -> Result<Vec<String>, LiteratureError> {
        let retmax = max_results.to_string();
        let response = self
            .get(
                "esearch.fcgi",
                &[
                    ("db", "pubmed"),
                    ("term", term),
                    ("retmax", retmax.as_str()),
                    ("sort", "pub_date"),
                    ("retmode", "json"),
                ],
            )
            .await?;

        let parsed: SearchResponse = response.json().await?;
        if let Some(error) = parsed.esearchresult.error {
            return Err(LiteratureError::Remote(error));
        }
        Ok(parsed.esearchresult.idlist)
    }

    async fn fetch_abstracts(&self, ids: &[String]) -> Result<String, LiteratureError> {
        let joined = ids.join(",");
        let response = self
            .get(
                "efetch.fcgi",
                &[
                    ("db", "pubmed"),
                    ("id", joined.as_str()),
                    ("rettype", "abstract"),
                    ("retmode", "text"),
                ],
            )
            .await?;
        Ok(response.text().await?)
    }
}

// ── Query policy ─────────────────────────────────────────────────────────

/// Build the E-utilities term: keywords plus an open-ended publication
/// window starting at `cutoff` (`YYYY/MM/DD`).
pub fn query_term(keywords: &str, cutoff: &str) -> String {
    format!("{keywords} AND ({cutoff}[Date - Publication] : 3000[Date - Publication])")
}

/// Runs the advisory literature search for one run.
pub struct LiteratureSearcher<'a> {
    source: &'a dyn LiteratureSource,
    config: &'a ReviewConfig,
}

impl<'a> LiteratureSearcher<'a> {
    pub fn new(source: &'a dyn LiteratureSource, config: &'a ReviewConfig) -> Self {
        Self { source, config }
    }

    /// Search for recent abstracts. Always returns text.
    ///
    /// Empty keywords return the sentinel without any remote call.
    pub async fn search(&self, keywords: &str, max_results: usize) -> String {
        let keywords = keywords.trim();
        if keywords.is_empty() {
            warn!("No keywords, skipping literature search");
            return self.config.no_results_sentinel.clone();
        }

        let term = query_term(keywords, &self.config.cutoff_query_date());
        debug!("PubMed term: {}", term);

        let ids = match self.source.search_ids(&term, max_results).await {
            Ok(ids) => ids,
            Err(e) => return connection_error(e),
        };
        if ids.is_empty() {
            info!("No recent literature for '{}'", keywords);
            return self.config.no_results_sentinel.clone();
        }

        info!("Fetching {} abstract(s)", ids.len());
        match self.source.fetch_abstracts(&ids).await {
            Ok(text) => text,
            Err(e) => connection_error(e),
        }
    }
}

fn connection_error(e: LiteratureError) -> String {
    warn!("Literature search failed: {}", e);
    format!("PubMed API connection error: {e}")
}
