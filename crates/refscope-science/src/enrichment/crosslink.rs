use refscope_core::{MetadataRecord, normalize_arxiv};
use tracing::info;

use crate::arxiv::parser::clean_text;
use crate::arxiv::{ArxivEntry, ArxivQuery};
use crate::enrichment::{Enricher, FallbackChain};
use crate::error::{Result, ScienceError};
use crate::page::PageField;

impl Enricher {
    /// Find the arXiv preprint of a DOI-identified record.
    pub async fn find_arxiv(&self, doi: &str, record: &MetadataRecord) -> Option<String> {
        FallbackChain::new("arxiv")
            .then("current page", move || self.arxiv_from_page())
            .then("doi search", move || async move {
                let hit = self.fetcher.search_arxiv(&ArxivQuery::all(doi)).await?;
                self.accept_candidate(record, hit).await
            })
            .then("title and author search", move || async move {
                let query = title_author_query(record)?;
                let hit = self.fetcher.search_arxiv(&query).await?;
                self.accept_candidate(record, hit).await
            })
            .run()
            .await
    }

    async fn arxiv_from_page(&self) -> Result<String> {
        let raw = self.probe.probe(PageField::ArxivId).await?;
        Ok(normalize_arxiv(&raw)?)
    }

    /// Accept a search hit outright when titles agree, otherwise only if
    /// the user confirms it.
    async fn accept_candidate(
        &self,
        record: &MetadataRecord,
        hit: Option<ArxivEntry>,
    ) -> Result<String> {
        let entry = hit.ok_or_else(|| ScienceError::NotFound("no arXiv search hit".into()))?;
        let title = record.title().unwrap_or_default();
        if titles_match(&title, &entry.title) {
            return Ok(entry.arxiv_id);
        }

        let prompt = format!(
            "arXiv:{} is titled \"{}\", which differs from \"{}\". Link it?",
            entry.arxiv_id, entry.title, title
        );
        if self.confirm.confirm(&prompt).await {
            info!(arxiv = %entry.arxiv_id, "title mismatch confirmed");
            Ok(entry.arxiv_id)
        } else {
            Err(ScienceError::NotFound(format!("arXiv:{} declined", entry.arxiv_id)))
        }
    }
}

fn title_author_query(record: &MetadataRecord) -> Result<ArxivQuery> {
    let title = record
        .title()
        .ok_or_else(|| ScienceError::NotFound("record has no title to search by".into()))?;
    let family = record
        .authors()
        .into_iter()
        .next()
        .map(|author| author.family)
        .unwrap_or_default();
    Ok(ArxivQuery::new().term("ti", &title).term("au", &family))
}

fn titles_match(a: &str, b: &str) -> bool {
    let a = clean_text(a);
    !a.is_empty() && a.to_lowercase() == clean_text(b).to_lowercase()
}
