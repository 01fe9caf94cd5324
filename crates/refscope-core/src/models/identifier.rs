use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

const ARXIV_ABS_PREFIXES: &[&str] = &[
    "https://arxiv.org/abs/",
    "http://arxiv.org/abs/",
    "https://export.arxiv.org/abs/",
    "http://export.arxiv.org/abs/",
];

const ARXIV_PDF_PREFIXES: &[&str] = &["https://arxiv.org/pdf/", "http://arxiv.org/pdf/"];

static VERSION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"v\d+$").expect("valid regex"));

// YYMM.NNNNN, or the pre-2007 category/YYMMNNN form; version optional.
static ARXIV_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}\.\d{4,5}|[a-zA-Z\-]+(\.[A-Z]{2})?/\d{7})(v\d+)?$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    Doi,
    Arxiv,
    Url,
}

impl IdKind {
    pub const ALL: [IdKind; 3] = [IdKind::Doi, IdKind::Arxiv, IdKind::Url];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doi => "doi",
            Self::Arxiv => "arxiv",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doi" => Ok(Self::Doi),
            "arxiv" => Ok(Self::Arxiv),
            "url" => Ok(Self::Url),
            other => Err(CoreError::InvalidIdentifier(format!(
                "unknown identifier kind: {other}"
            ))),
        }
    }
}

/// A normalized (kind, value) pair naming a work.
///
/// The value is canonicalized on construction, so two identifiers compare
/// equal exactly when they produce the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    kind: IdKind,
    value: String,
}

impl Identifier {
    pub fn new(kind: IdKind, raw: &str) -> Result<Self> {
        let value = match kind {
            IdKind::Doi => normalize_doi(raw)?,
            IdKind::Arxiv => normalize_arxiv(raw)?,
            IdKind::Url => normalize_url(raw)?,
        };
        Ok(Self { kind, value })
    }

    /// Parse from a textual kind (`doi`, `arxiv`, `url`) and a raw value.
    pub fn parse(kind: &str, raw: &str) -> Result<Self> {
        Self::new(kind.parse()?, raw)
    }

    pub fn doi(raw: &str) -> Result<Self> {
        Self::new(IdKind::Doi, raw)
    }

    pub fn arxiv(raw: &str) -> Result<Self> {
        Self::new(IdKind::Arxiv, raw)
    }

    pub fn url(raw: &str) -> Result<Self> {
        Self::new(IdKind::Url, raw)
    }

    /// Guess the kind of a free-form input.
    pub fn detect(raw: &str) -> Result<Self> {
        let input = raw.trim();
        let lower = input.to_ascii_lowercase();

        if DOI_PREFIXES.iter().any(|p| lower.starts_with(p))
            || lower.starts_with("doi:")
            || input.starts_with("10.")
        {
            return Self::doi(input);
        }

        if ARXIV_ABS_PREFIXES
            .iter()
            .chain(ARXIV_PDF_PREFIXES)
            .any(|p| lower.starts_with(p))
            || lower.starts_with("arxiv:")
            || ARXIV_SHAPE.is_match(input)
        {
            return Self::arxiv(input);
        }

        if lower.starts_with("https://") || lower.starts_with("http://") {
            return Self::url(input);
        }

        Err(CoreError::InvalidIdentifier(format!(
            "cannot tell what kind of identifier this is: {input}"
        )))
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Key under which this identifier's record is cached.
    pub fn cache_key(&self) -> String {
        match self.kind {
            IdKind::Url => format!("{}:{}", self.kind, strip_scheme(&self.value)),
            _ => format!("{}:{}", self.kind, self.value),
        }
    }

    /// Whether a raw store key belongs to the identifier key space.
    pub fn is_cache_key(key: &str) -> bool {
        IdKind::ALL
            .iter()
            .any(|kind| key.len() > kind.as_str().len() + 1 && key.starts_with(&format!("{kind}:")))
    }

    /// Value as used in library paths: URLs lose their scheme.
    pub fn library_value(&self) -> &str {
        match self.kind {
            IdKind::Url => strip_scheme(&self.value),
            _ => &self.value,
        }
    }

    /// Relative document path inside a curated library: `<kind>/<value>`.
    pub fn library_path(&self) -> String {
        format!("{}/{}", self.kind, self.library_value())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

pub fn normalize_doi(raw: &str) -> Result<String> {
    let input = raw.trim();
    let stripped = DOI_PREFIXES
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(input, prefix))
        .unwrap_or(input);
    let stripped = strip_prefix_ignore_case(stripped, "doi:")
        .map(str::trim_start)
        .unwrap_or(stripped);

    let valid = stripped.starts_with("10.")
        && stripped
            .split_once('/')
            .is_some_and(|(_, suffix)| !suffix.is_empty());
    if !valid {
        return Err(CoreError::InvalidIdentifier(format!("invalid DOI: {input}")));
    }
    Ok(stripped.to_string())
}

/// arXiv ids are case-insensitive; the canonical form is lower-case.
pub fn normalize_arxiv(raw: &str) -> Result<String> {
    let input = raw.trim().to_lowercase();
    let input = input.as_str();
    let stripped = if let Some(s) = ARXIV_ABS_PREFIXES.iter().find_map(|p| input.strip_prefix(p)) {
        s
    } else if let Some(s) = ARXIV_PDF_PREFIXES.iter().find_map(|p| input.strip_prefix(p)) {
        s.trim_end_matches(".pdf")
    } else if let Some(s) = strip_prefix_ignore_case(input, "arxiv:") {
        s.trim_start()
    } else {
        input
    };

    let id = VERSION_SUFFIX.replace(stripped, "");
    if id.is_empty() {
        return Err(CoreError::InvalidIdentifier(format!(
            "invalid arXiv ID: {input}"
        )));
    }
    Ok(id.into_owned())
}

fn normalize_url(raw: &str) -> Result<String> {
    let input = raw.trim();
    if strip_scheme(input).is_empty() {
        return Err(CoreError::InvalidIdentifier("empty URL".to_string()));
    }
    Ok(input.to_string())
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &input[prefix.len()..])
}
