//! Metadata carried in a page's `<meta>` tags.

use std::fmt;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::enrichment::PageProbe;
use crate::error::{Result, ScienceError};

/// A named value that can be read off a landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageField {
    Abstract,
    ArxivId,
}

impl PageField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abstract => "abstract",
            Self::ArxivId => "arxiv-id",
        }
    }

    /// `name`/`property` values to look for, in priority order.
    fn meta_names(&self) -> &'static [&'static str] {
        match self {
            Self::Abstract => &[
                "citation_abstract",
                "description",
                "og:description",
                "dc.description",
            ],
            Self::ArxivId => &["citation_arxiv_id"],
        }
    }
}

impl fmt::Display for PageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `content` of the first matching meta tag for `field`.
///
/// `name` and `property` are compared case-insensitively; tags with an
/// empty `content` are skipped.
pub fn extract_meta(html: &str, field: PageField) -> Result<String> {
    let document = Html::parse_document(html);
    let selector = parse_selector("meta[content]")?;

    let metas = document
        .select(&selector)
        .filter_map(|element| {
            let attrs = element.value();
            let key = attrs.attr("name").or_else(|| attrs.attr("property"))?;
            let content = attrs.attr("content")?.trim();
            (!content.is_empty()).then_some((key, content))
        })
        .collect::<Vec<_>>();

    field
        .meta_names()
        .iter()
        .find_map(|wanted| {
            metas
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
                .map(|(_, content)| content.to_string())
        })
        .ok_or_else(|| ScienceError::NotFound(format!("page has no {field} meta tag")))
}

fn parse_selector(input: &str) -> Result<Selector> {
    Selector::parse(input)
        .map_err(|e| ScienceError::ParseFailed(format!("invalid selector {input}: {e}")))
}

/// Page probe over an HTML document already in hand.
pub struct HtmlPageProbe {
    html: String,
}

impl HtmlPageProbe {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

#[async_trait]
impl PageProbe for HtmlPageProbe {
    async fn probe(&self, field: PageField) -> Result<String> {
        extract_meta(&self.html, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDING: &str = r#"<!doctype html>
<html><head>
  <meta name="Description" content="Generic description.">
  <meta property="og:description" content="Open graph text.">
  <meta name="citation_doi" content="10.1103/PhysRevLett.1">
  <meta name="citation_arxiv_id" content="">
</head><body></body></html>"#;

    #[test]
    fn description_is_found_case_insensitively() {
        assert_eq!(
            extract_meta(LANDING, PageField::Abstract).unwrap(),
            "Generic description."
        );
    }

    #[test]
    fn citation_abstract_takes_priority() {
        let html = r#"<html><head>
  <meta name="description" content="Generic.">
  <meta name="CITATION_ABSTRACT" content="  The real abstract.  ">
</head></html>"#;
        assert_eq!(extract_meta(html, PageField::Abstract).unwrap(), "The real abstract.");
    }

    #[test]
    fn empty_content_is_not_found() {
        assert!(matches!(
            extract_meta(LANDING, PageField::ArxivId),
            Err(ScienceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn html_probe_reads_its_document() {
        let probe = HtmlPageProbe::new(LANDING);
        assert_eq!(
            probe.probe(PageField::Abstract).await.unwrap(),
            "Generic description."
        );
        assert!(probe.probe(PageField::ArxivId).await.is_err());
    }
}
