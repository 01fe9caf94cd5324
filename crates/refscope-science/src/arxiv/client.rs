use std::sync::Arc;

use tracing::debug;

use crate::arxiv::parser::{ArxivEntry, parse_feed};
use crate::arxiv::query::ArxivQuery;
use crate::error::{Result, ScienceError};
use crate::http::RateLimitedClient;

const ATOM_ACCEPT: &str = "application/xml";

pub struct ArxivClient {
    http: Arc<RateLimitedClient>,
    base_url: String,
}

impl ArxivClient {
    pub fn new(http: Arc<RateLimitedClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    fn url(&self, params: &str) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}{params}", self.base_url)
    }

    /// The entry for one arXiv id; `NotFound` when the feed has none.
    pub async fn fetch_entry(&self, id: &str) -> Result<ArxivEntry> {
        let url = self.url(&format!("id_list={}", urlencoding::encode(id)));
        let xml = self.http.get_accepting(&url, ATOM_ACCEPT).await?;
        parse_feed(&xml)?
            .into_iter()
            .next()
            .ok_or_else(|| ScienceError::NotFound(format!("arXiv has no entry for {id}")))
    }

    /// First hit of a search, if any.
    pub async fn search(&self, query: &ArxivQuery) -> Result<Option<ArxivEntry>> {
        if query.is_empty() {
            return Ok(None);
        }
        let query_str = query.to_query_string();
        let url = self.url(&format!("search_query={query_str}&max_results=1"));
        let xml = self.http.get_accepting(&url, ATOM_ACCEPT).await?;
        let first = parse_feed(&xml)?.into_iter().next();
        debug!(query = %query_str, hit = first.is_some(), "arXiv search");
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    const ENTRY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2101.00001v2</id>
    <published>2021-01-01T10:00:00Z</published>
    <title>A Preprint</title>
    <summary>Short.</summary>
    <author><name>Ada Lovelace</name></author>
  </entry>
</feed>"#;

    const EMPTY_XML: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>query</title></feed>"#;

    fn client(server: &Server) -> ArxivClient {
        let http = RateLimitedClient::with_params(
            Duration::ZERO,
            0,
            "refscope-test",
            "X-Refscope-Lookup",
            "1",
        )
        .unwrap();
        ArxivClient::new(Arc::new(http), &format!("{}/api/query", server.url()))
    }

    #[tokio::test]
    async fn fetches_entry_by_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("id_list".into(), "2101.00001".into()))
            .match_header("x-refscope-lookup", "1")
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(ENTRY_XML)
            .expect(1)
            .create_async()
            .await;

        let entry = client(&server).fetch_entry("2101.00001").await.unwrap();
        assert_eq!(entry.arxiv_id, "2101.00001");
        assert_eq!(entry.title, "A Preprint");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(EMPTY_XML)
            .create_async()
            .await;

        let err = client(&server).fetch_entry("9999.99999").await.unwrap_err();
        assert!(matches!(err, ScienceError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_requests_a_single_result() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "all:10.1/x".into()),
                Matcher::UrlEncoded("max_results".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(ENTRY_XML)
            .expect(1)
            .create_async()
            .await;

        let hit = client(&server)
            .search(&ArxivQuery::all("10.1/X"))
            .await
            .unwrap();
        assert_eq!(hit.map(|e| e.arxiv_id).as_deref(), Some("2101.00001"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_search_makes_no_request() {
        let server = Server::new_async().await;
        let hit = client(&server).search(&ArxivQuery::new()).await.unwrap();
        assert!(hit.is_none());
    }
}
