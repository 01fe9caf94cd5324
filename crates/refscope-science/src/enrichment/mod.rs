//! Best-effort backfill of fields the remote record left out.

pub mod abstracts;
pub mod chain;
pub mod crosslink;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, ScienceError};
use crate::fetch::MetadataFetcher;
use crate::page::PageField;

pub use chain::{Attempt, FallbackChain};

/// Reads a named field from whatever page the host considers current.
#[async_trait]
pub trait PageProbe: Send + Sync {
    async fn probe(&self, field: PageField) -> Result<String>;
}

/// Asks a yes/no question; may wait indefinitely on a human.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Probe for hosts without a current page.
pub struct NoPage;

#[async_trait]
impl PageProbe for NoPage {
    async fn probe(&self, field: PageField) -> Result<String> {
        Err(ScienceError::NotFound(format!("no current page to read {field} from")))
    }
}

/// Confirmation that always gives the same answer.
pub struct FixedAnswer(pub bool);

#[async_trait]
impl Confirmation for FixedAnswer {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

pub struct Enricher {
    fetcher: Arc<dyn MetadataFetcher>,
    probe: Arc<dyn PageProbe>,
    confirm: Arc<dyn Confirmation>,
}

impl Enricher {
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        probe: Arc<dyn PageProbe>,
        confirm: Arc<dyn Confirmation>,
    ) -> Self {
        Self {
            fetcher,
            probe,
            confirm,
        }
    }
}
