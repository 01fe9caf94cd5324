use refscope_core::MetadataRecord;
use serde_json::Value;

use crate::enrichment::{Enricher, FallbackChain};
use crate::error::{Result, ScienceError};
use crate::page::{PageField, extract_meta};

const SYNDICATION: &str = "syndication";

impl Enricher {
    /// Try the syndication feed, then the DOI landing page, then the
    /// current page.
    pub async fn find_abstract(&self, record: &MetadataRecord) -> Option<String> {
        FallbackChain::new("abstract")
            .then("syndication link", move || self.abstract_from_syndication(record))
            .then("landing page", move || self.abstract_from_landing_page(record))
            .then("current page", move || self.probe.probe(PageField::Abstract))
            .run()
            .await
    }

    async fn abstract_from_syndication(&self, record: &MetadataRecord) -> Result<String> {
        let url = syndication_url(record)
            .ok_or_else(|| ScienceError::NotFound("record has no syndication link".into()))?;
        let body = self.fetcher.fetch_json(&url).await?;
        body.pointer("/data/abstract/value")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| ScienceError::NotFound(format!("{url} carries no abstract")))
    }

    async fn abstract_from_landing_page(&self, record: &MetadataRecord) -> Result<String> {
        let doi = record
            .doi()
            .ok_or_else(|| ScienceError::NotFound("record has no DOI".into()))?;
        let html = self.fetcher.fetch_landing_page(&doi).await?;
        extract_meta(&html, PageField::Abstract)
    }
}

/// URL of the first link whose relation marks it as syndication.
fn syndication_url(record: &MetadataRecord) -> Option<String> {
    record.links().into_iter().find_map(|link| {
        let syndicated = ["intended-application", "rel", "relation"]
            .iter()
            .filter_map(|key| link.get(*key).and_then(Value::as_str))
            .any(|relation| relation.eq_ignore_ascii_case(SYNDICATION));
        if !syndicated {
            return None;
        }
        ["URL", "url", "href"]
            .iter()
            .filter_map(|key| link.get(*key).and_then(Value::as_str))
            .find(|url| !url.trim().is_empty())
            .map(ToOwned::to_owned)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, StubProbe, enricher};
    use serde_json::json;
    use std::sync::Arc;

    fn record(value: Value) -> MetadataRecord {
        MetadataRecord::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn syndication_link_is_used_first() {
        let fetcher = Arc::new(StubFetcher::default().with_json(
            "https://api.example.org/works/1",
            json!({"data": {"abstract": {"value": "From the feed."}}}),
        ));
        let probe = Arc::new(StubProbe::default().with(PageField::Abstract, "From the page."));
        let engine = enricher(fetcher.clone(), probe.clone(), false);

        let found = engine
            .find_abstract(&record(json!({
                "DOI": "10.1/x",
                "link": [
                    {"URL": "https://example.org/pdf", "intended-application": "text-mining"},
                    {"URL": "https://api.example.org/works/1", "intended-application": "syndication"}
                ]
            })))
            .await;

        assert_eq!(found.as_deref(), Some("From the feed."));
        assert_eq!(fetcher.landing_page_calls(), 0);
        assert_eq!(probe.calls(PageField::Abstract), 0);
    }

    #[tokio::test]
    async fn landing_page_wins_when_syndication_fails_and_probe_is_never_asked() {
        let fetcher = Arc::new(StubFetcher::default().with_landing_page(
            "10.1/x",
            r#"<html><head><meta name="citation_abstract" content="From the landing page."></head></html>"#,
        ));
        let probe = Arc::new(StubProbe::default().with(PageField::Abstract, "From the page."));
        let engine = enricher(fetcher.clone(), probe.clone(), false);

        let found = engine
            .find_abstract(&record(json!({
                "DOI": "10.1/x",
                "link": [{"URL": "https://gone.example.org", "intended-application": "syndication"}]
            })))
            .await;

        assert_eq!(found.as_deref(), Some("From the landing page."));
        assert_eq!(fetcher.json_calls(), 1);
        assert_eq!(probe.calls(PageField::Abstract), 0);
    }

    #[tokio::test]
    async fn current_page_is_the_last_resort() {
        let fetcher = Arc::new(StubFetcher::default());
        let probe = Arc::new(StubProbe::default().with(PageField::Abstract, "From the page."));
        let engine = enricher(fetcher, probe.clone(), false);

        let found = engine.find_abstract(&record(json!({"doi": "10.1/x"}))).await;
        assert_eq!(found.as_deref(), Some("From the page."));
        assert_eq!(probe.calls(PageField::Abstract), 1);
    }

    #[tokio::test]
    async fn all_strategies_failing_leaves_abstract_absent() {
        let engine = enricher(
            Arc::new(StubFetcher::default()),
            Arc::new(StubProbe::default()),
            false,
        );
        assert!(engine.find_abstract(&record(json!({"title": "T"}))).await.is_none());
    }

    #[test]
    fn syndication_relation_variants() {
        let rec = record(json!({"link": [{"href": "https://a.example", "rel": "Syndication"}]}));
        assert_eq!(syndication_url(&rec).as_deref(), Some("https://a.example"));

        let without_url = record(json!({"link": [{"relation": "syndication"}]}));
        assert!(syndication_url(&without_url).is_none());
    }
}
