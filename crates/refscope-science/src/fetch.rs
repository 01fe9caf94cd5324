use std::sync::Arc;

use async_trait::async_trait;
use refscope_core::{MetadataRecord, NetworkConfig};
use serde_json::Value;

use crate::arxiv::{ArxivClient, ArxivEntry, ArxivQuery};
use crate::error::{Result, ScienceError};
use crate::http::RateLimitedClient;

pub const CSL_JSON: &str = "application/vnd.citationstyles.csl+json";

/// Network entry points used by the remote tier and by enrichment.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// CSL-JSON record for a DOI, returned as the server sent it.
    async fn fetch_doi(&self, doi: &str) -> Result<MetadataRecord>;

    /// Record mapped from the arXiv feed entry for an id.
    async fn fetch_arxiv(&self, id: &str) -> Result<MetadataRecord>;

    async fn search_arxiv(&self, query: &ArxivQuery) -> Result<Option<ArxivEntry>>;

    async fn fetch_json(&self, url: &str) -> Result<Value>;

    /// HTML of the page a DOI resolves to.
    async fn fetch_landing_page(&self, doi: &str) -> Result<String>;
}

pub struct HttpFetcher {
    http: Arc<RateLimitedClient>,
    arxiv: ArxivClient,
    doi_base_url: String,
}

impl HttpFetcher {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let http = Arc::new(RateLimitedClient::new(config)?);
        Ok(Self::with_client(http, &config.doi_base_url, &config.arxiv_api_url))
    }

    pub fn with_client(http: Arc<RateLimitedClient>, doi_base_url: &str, arxiv_api_url: &str) -> Self {
        Self {
            arxiv: ArxivClient::new(Arc::clone(&http), arxiv_api_url),
            http,
            doi_base_url: doi_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn doi_url(&self, doi: &str) -> String {
        format!("{}/{doi}", self.doi_base_url)
    }
}

#[async_trait]
impl MetadataFetcher for HttpFetcher {
    async fn fetch_doi(&self, doi: &str) -> Result<MetadataRecord> {
        let url = self.doi_url(doi);
        let body: Value = self.http.get_json(&url, CSL_JSON).await?;
        MetadataRecord::from_value(body)
            .ok_or_else(|| ScienceError::ParseFailed(format!("{url}: CSL body is not an object")))
    }

    async fn fetch_arxiv(&self, id: &str) -> Result<MetadataRecord> {
        Ok(self.arxiv.fetch_entry(id).await?.into_record())
    }

    async fn search_arxiv(&self, query: &ArxivQuery) -> Result<Option<ArxivEntry>> {
        self.arxiv.search(query).await
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.http.get_json(url, "application/json").await
    }

    async fn fetch_landing_page(&self, doi: &str) -> Result<String> {
        self.http.get_accepting(&self.doi_url(doi), "text/html").await
    }
}
