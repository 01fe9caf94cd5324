use quick_xml::de::from_str;
use refscope_core::{Author, MetadataRecord, keys, normalize_arxiv};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{Result, ScienceError};

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(default)]
    updated: String,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
    #[serde(rename = "arxiv:primary_category", alias = "primary_category")]
    primary_category: Option<AtomCategory>,
    #[serde(rename = "arxiv:comment", alias = "comment")]
    comment: Option<String>,
    #[serde(rename = "arxiv:journal_ref", alias = "journal_ref")]
    journal_ref: Option<String>,
    #[serde(rename = "arxiv:doi", alias = "doi")]
    doi: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
    #[serde(rename = "@type")]
    link_type: Option<String>,
    #[serde(rename = "@title")]
    title: Option<String>,
}

/// One arXiv feed entry, cleaned up but not yet in record shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArxivEntry {
    /// Lower-cased, without URL prefix or version.
    pub arxiv_id: String,
    pub title: String,
    pub summary: String,
    pub published: String,
    pub updated: String,
    pub authors: Vec<String>,
    /// Primary category first, then the remaining ones.
    pub categories: Vec<String>,
    pub doi: Option<String>,
    pub comment: Option<String>,
    pub journal_ref: Option<String>,
    /// Attribute maps of the entry's `<link>` elements.
    pub links: Vec<Map<String, Value>>,
}

impl ArxivEntry {
    pub fn into_record(self) -> MetadataRecord {
        let mut record = MetadataRecord::new();

        record.insert(keys::ARXIV, self.arxiv_id.clone());
        if !self.title.is_empty() {
            record.insert(keys::TITLE, self.title);
        }
        if !self.summary.is_empty() {
            record.insert(keys::ABSTRACT, self.summary);
        }
        if let Some(parts) = date_parts(&self.published) {
            record.insert(keys::DATE, parts);
        }
        if let Some(parts) = date_parts(&self.updated) {
            record.insert("updated", json!({ "date-parts": [parts] }));
        }
        if let Some(doi) = self.doi {
            record.insert(keys::DOI, doi);
        }
        if let Some(comment) = self.comment {
            record.insert("comment", comment);
        }
        if let Some(journal_ref) = self.journal_ref {
            record.insert("journal_ref", journal_ref);
        }
        if !self.categories.is_empty() {
            record.insert("category", self.categories);
        }
        if !self.authors.is_empty() {
            let authors = self
                .authors
                .iter()
                .map(|name| Author::from_display_name(name))
                .collect::<Vec<_>>();
            record.set_authors(&authors);
        }
        if !self.links.is_empty() {
            record.insert(
                keys::LINK,
                self.links.into_iter().map(Value::Object).collect::<Vec<_>>(),
            );
        }

        record.insert(keys::ARTICLE_NUMBER, self.arxiv_id);
        record.insert(keys::CONTAINER_TITLE, "arXiv");
        record
    }
}

/// Parse an arXiv Atom response. API error entries are dropped, so a
/// rejected query looks the same as an empty result.
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>> {
    let feed: AtomFeed =
        from_str(xml).map_err(|e| ScienceError::ParseFailed(format!("invalid atom xml: {e}")))?;

    Ok(feed
        .entries
        .into_iter()
        .filter(|entry| !entry.id.trim().is_empty() && !entry.id.contains("/api/errors"))
        .filter_map(parse_entry)
        .collect())
}

fn parse_entry(entry: AtomEntry) -> Option<ArxivEntry> {
    let arxiv_id = normalize_arxiv(&entry.id).ok()?;

    let mut categories = Vec::new();
    let terms = entry
        .primary_category
        .into_iter()
        .chain(entry.categories)
        .filter_map(|category| clean_optional(category.term));
    for term in terms {
        if !categories.contains(&term) {
            categories.push(term);
        }
    }

    let links = entry
        .links
        .into_iter()
        .map(|link| {
            [
                ("href", link.href),
                ("rel", link.rel),
                ("type", link.link_type),
                ("title", link.title),
            ]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), Value::String(v))))
            .collect::<Map<_, _>>()
        })
        .filter(|attrs| !attrs.is_empty())
        .collect();

    Some(ArxivEntry {
        arxiv_id,
        title: clean_text(&entry.title),
        summary: clean_text(&entry.summary),
        published: entry.published.trim().to_string(),
        updated: entry.updated.trim().to_string(),
        authors: entry
            .authors
            .into_iter()
            .map(|author| clean_text(&author.name))
            .filter(|name| !name.is_empty())
            .collect(),
        categories,
        doi: clean_optional(entry.doi),
        comment: clean_optional(entry.comment),
        journal_ref: clean_optional(entry.journal_ref),
        links,
    })
}

/// `2017-06-12T17:57:40Z` → `[2017, 6, 12]`.
fn date_parts(timestamp: &str) -> Option<Vec<i64>> {
    let day = timestamp.get(..10).unwrap_or(timestamp);
    let parts = day
        .split('-')
        .map_while(|part| part.trim().parse::<i64>().ok())
        .collect::<Vec<_>>();
    (!parts.is_empty()).then_some(parts)
}

pub(crate) fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}
