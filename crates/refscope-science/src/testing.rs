//! Stub collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use refscope_core::{CoreError, Identifier, LibraryIndex, MetadataRecord};
use serde_json::Value;

use crate::arxiv::{ArxivEntry, ArxivQuery};
use crate::enrichment::{Confirmation, Enricher, FixedAnswer, PageProbe};
use crate::error::{Result, ScienceError};
use crate::fetch::MetadataFetcher;
use crate::page::PageField;
use crate::resolver::StatusSink;

#[derive(Default)]
pub struct StubFetcher {
    doi: HashMap<String, Value>,
    arxiv: HashMap<String, Value>,
    search_hits: HashMap<String, ArxivEntry>,
    json: HashMap<String, Value>,
    pages: HashMap<String, String>,
    doi_calls: AtomicUsize,
    arxiv_calls: AtomicUsize,
    json_calls: AtomicUsize,
    page_calls: AtomicUsize,
    searched: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn with_doi(mut self, doi: &str, body: Value) -> Self {
        self.doi.insert(doi.to_string(), body);
        self
    }

    pub fn with_arxiv(mut self, id: &str, body: Value) -> Self {
        self.arxiv.insert(id.to_string(), body);
        self
    }

    pub fn with_search(mut self, query: ArxivQuery, hit: ArxivEntry) -> Self {
        self.search_hits.insert(query.to_query_string(), hit);
        self
    }

    pub fn with_json(mut self, url: &str, body: Value) -> Self {
        self.json.insert(url.to_string(), body);
        self
    }

    pub fn with_landing_page(mut self, doi: &str, html: &str) -> Self {
        self.pages.insert(doi.to_string(), html.to_string());
        self
    }

    pub fn json_calls(&self) -> usize {
        self.json_calls.load(Ordering::SeqCst)
    }

    pub fn landing_page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    /// Query strings of every search, in order.
    pub fn searches(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.doi_calls.load(Ordering::SeqCst)
            + self.arxiv_calls.load(Ordering::SeqCst)
            + self.json_calls()
            + self.landing_page_calls()
            + self.searches().len()
    }
}

#[async_trait]
impl MetadataFetcher for StubFetcher {
    async fn fetch_doi(&self, doi: &str) -> Result<MetadataRecord> {
        self.doi_calls.fetch_add(1, Ordering::SeqCst);
        self.doi
            .get(doi)
            .cloned()
            .and_then(MetadataRecord::from_value)
            .ok_or_else(|| ScienceError::FetchFailed(format!("{doi}: HTTP 404")))
    }

    async fn fetch_arxiv(&self, id: &str) -> Result<MetadataRecord> {
        self.arxiv_calls.fetch_add(1, Ordering::SeqCst);
        self.arxiv
            .get(id)
            .cloned()
            .and_then(MetadataRecord::from_value)
            .ok_or_else(|| ScienceError::NotFound(format!("arXiv has no entry for {id}")))
    }

    async fn search_arxiv(&self, query: &ArxivQuery) -> Result<Option<ArxivEntry>> {
        let key = query.to_query_string();
        self.searched.lock().unwrap().push(key.clone());
        Ok(self.search_hits.get(&key).cloned())
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.json_calls.fetch_add(1, Ordering::SeqCst);
        self.json
            .get(url)
            .cloned()
            .ok_or_else(|| ScienceError::FetchFailed(format!("{url}: HTTP 404")))
    }

    async fn fetch_landing_page(&self, doi: &str) -> Result<String> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(doi)
            .cloned()
            .ok_or_else(|| ScienceError::FetchFailed(format!("{doi}: HTTP 404")))
    }
}

#[derive(Default)]
pub struct StubLibrary {
    entries: HashMap<String, Value>,
    calls: AtomicUsize,
}

impl StubLibrary {
    pub fn with(mut self, id: &Identifier, body: Value) -> Self {
        self.entries.insert(id.cache_key(), body);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LibraryIndex for StubLibrary {
    async fn lookup(&self, id: &Identifier) -> refscope_core::Result<MetadataRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(&id.cache_key())
            .cloned()
            .and_then(MetadataRecord::from_value)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }
}

#[derive(Default)]
pub struct StubProbe {
    values: HashMap<PageField, String>,
    calls: Mutex<HashMap<PageField, usize>>,
}

impl StubProbe {
    pub fn with(mut self, field: PageField, value: &str) -> Self {
        self.values.insert(field, value.to_string());
        self
    }

    pub fn calls(&self, field: PageField) -> usize {
        self.calls.lock().unwrap().get(&field).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PageProbe for StubProbe {
    async fn probe(&self, field: PageField) -> Result<String> {
        *self.calls.lock().unwrap().entry(field).or_default() += 1;
        self.values
            .get(&field)
            .cloned()
            .ok_or_else(|| ScienceError::NotFound(format!("no {field} on page")))
    }
}

pub struct CountingConfirm {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl CountingConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmation for CountingConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
    }
}

#[derive(Default)]
pub struct RecordingSink {
    statuses: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn all(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.statuses.lock().unwrap().last().cloned()
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }
}

pub fn enricher(fetcher: Arc<StubFetcher>, probe: Arc<StubProbe>, answer: bool) -> Enricher {
    Enricher::new(fetcher, probe, Arc::new(FixedAnswer(answer)))
}
