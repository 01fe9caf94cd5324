//! The cache → library → remote cascade.

use std::fmt;
use std::sync::Arc;

use refscope_core::{
    CacheStore, IdKind, Identifier, LibraryIndex, MetadataRecord, keys, resolve_date,
};
use tracing::{debug, info, warn};

use crate::enrichment::{Confirmation, Enricher, PageProbe};
use crate::error::{Result, ScienceError};
use crate::fetch::MetadataFetcher;
use crate::naming::{FilenameStrategy, JournalVolumePage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    CheckingCache,
    CheckingLibrary,
    FetchingRemote,
    Enriching,
    Done,
    Failed,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckingCache => "checking cache",
            Self::CheckingLibrary => "checking library",
            Self::FetchingRemote => "fetching remote",
            Self::Enriching => "enriching",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives a human-readable line on every state transition.
pub trait StatusSink: Send + Sync {
    fn report(&self, status: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, status: &str) {
        self(status)
    }
}

/// Writes statuses as `info` events on the `refscope::status` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn report(&self, status: &str) {
        info!(target: "refscope::status", "{status}");
    }
}

pub struct Resolver {
    cache: Arc<CacheStore>,
    library: Arc<dyn LibraryIndex>,
    fetcher: Arc<dyn MetadataFetcher>,
    enricher: Enricher,
    naming: Arc<dyn FilenameStrategy>,
    status: Arc<dyn StatusSink>,
}

impl Resolver {
    pub fn new(
        cache: Arc<CacheStore>,
        library: Arc<dyn LibraryIndex>,
        fetcher: Arc<dyn MetadataFetcher>,
        probe: Arc<dyn PageProbe>,
        confirm: Arc<dyn Confirmation>,
    ) -> Self {
        Self {
            enricher: Enricher::new(Arc::clone(&fetcher), probe, confirm),
            cache,
            library,
            fetcher,
            naming: Arc::new(JournalVolumePage),
            status: Arc::new(TracingSink),
        }
    }

    pub fn with_naming(mut self, naming: impl FilenameStrategy + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    pub fn with_status_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.status = Arc::new(sink);
        self
    }

    pub fn filename_for(&self, record: &MetadataRecord) -> String {
        self.naming.filename(record)
    }

    /// Resolve an identifier to a record, trying each tier in order.
    ///
    /// Only a miss on every tier is an error; enrichment never fails the
    /// resolution.
    pub async fn resolve(&self, id: &Identifier) -> Result<MetadataRecord> {
        self.enter(ResolutionState::CheckingCache, &format!("looking up {id} in cache"));
        match self.cache.get(id).await {
            Ok(Some(record)) => {
                self.enter(ResolutionState::Done, "loaded from cache");
                return Ok(record);
            }
            Ok(None) => {}
            Err(e) => warn!(%id, error = %e, "cache read failed"),
        }

        self.enter(ResolutionState::CheckingLibrary, &format!("looking up {id} in local library"));
        match self.library.lookup(id).await {
            Ok(record) => {
                let record = self.commit(id, record).await;
                self.enter(ResolutionState::Done, "found in local library");
                return Ok(record);
            }
            Err(e) => debug!(%id, error = %e, "library miss"),
        }

        self.enter(ResolutionState::FetchingRemote, &format!("fetching metadata for {id}"));
        let fetched = match id.kind() {
            IdKind::Doi => self.fetcher.fetch_doi(id.value()).await,
            IdKind::Arxiv => self.fetcher.fetch_arxiv(id.value()).await,
            IdKind::Url => {
                return Err(self.fail(format!("{id} is not in the cache or library")));
            }
        };
        let mut record = match fetched {
            Ok(record) => record,
            Err(e) => return Err(self.fail(format!("fetching metadata for {id} failed: {e}"))),
        };

        self.enter(ResolutionState::Enriching, &format!("enriching {id}"));
        if id.kind() == IdKind::Doi && !record.has(keys::DOI) {
            record.insert(keys::DOI, id.value());
        }
        if record.date().is_none() {
            resolve_date(&mut record);
        }
        let mut record = self.commit(id, record).await;

        if !record.has(keys::ABSTRACT)
            && let Some(text) = self.enricher.find_abstract(&record).await
        {
            record = self.commit_field(id, keys::ABSTRACT, text).await;
        }
        if id.kind() == IdKind::Doi
            && !record.has(keys::ARXIV)
            && let Some(arxiv) = self.enricher.find_arxiv(id.value(), &record).await
        {
            record = self.commit_field(id, keys::ARXIV, arxiv).await;
        }

        self.enter(ResolutionState::Done, "metadata fetched");
        Ok(record)
    }

    /// Merge into the cache and return the merged record. A failing store
    /// degrades to the unmerged record.
    async fn commit(&self, id: &Identifier, patch: MetadataRecord) -> MetadataRecord {
        match self.cache.merge(id, patch.clone()).await {
            Ok(merged) => merged,
            Err(e) => {
                warn!(%id, error = %e, "cache write failed");
                patch
            }
        }
    }

    async fn commit_field(&self, id: &Identifier, key: &str, value: String) -> MetadataRecord {
        let mut patch = MetadataRecord::new();
        patch.insert(key, value);
        let merged = self.commit(id, patch).await;
        debug!(%id, field = key, "enriched");
        merged
    }

    fn enter(&self, state: ResolutionState, status: &str) {
        debug!(%state, "resolution state");
        self.status.report(status);
    }

    fn fail(&self, status: String) -> ScienceError {
        self.enter(ResolutionState::Failed, &status);
        ScienceError::ResolutionFailed(status)
    }
}
