use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical record keys. Everything else a source returns is kept as-is.
pub mod keys {
    pub const AUTHOR: &str = "author";
    pub const DATE: &str = "date";
    pub const TITLE: &str = "title";
    pub const CONTAINER_TITLE: &str = "container-title";
    pub const CONTAINER_TITLE_SHORT: &str = "container-title-short";
    pub const VOLUME: &str = "volume";
    pub const ISSUE: &str = "issue";
    pub const PAGE: &str = "page";
    pub const ARTICLE_NUMBER: &str = "article-number";
    pub const DOI: &str = "doi";
    pub const ARXIV: &str = "arxiv";
    pub const ABSTRACT: &str = "abstract";
    pub const TAG: &str = "tag";
    pub const NOTE: &str = "note";
    pub const LOCALFILE: &str = "localfile";
    pub const LINK: &str = "link";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub given: String,
    #[serde(default)]
    pub family: String,
}

impl Author {
    /// Split a display name on whitespace; the last token is the family name.
    pub fn from_display_name(name: &str) -> Self {
        let mut tokens: Vec<&str> = name.split_whitespace().collect();
        let family = tokens.pop().unwrap_or_default().to_string();
        Self {
            given: tokens.join(" "),
            family,
        }
    }
}

/// A bibliographic record in canonical key shape.
///
/// Backed by a JSON object so that keys this crate does not interpret
/// survive every load, merge and store untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord(Map<String, Value>);

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; only objects are records.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True when the key holds something other than null or an empty string/list.
    pub fn has(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(_) => true,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Shallow merge: every key in `patch` overwrites the same key here.
    pub fn merge(&mut self, patch: MetadataRecord) {
        for (key, value) in patch.0 {
            self.0.insert(key, value);
        }
    }

    /// Text value of a field, tolerating the shapes upstream sources use:
    /// a string, a number, or a list whose first element is a string.
    pub fn text(&self, key: &str) -> Option<String> {
        let value = match self.0.get(key)? {
            Value::Array(items) => items.first()?,
            other => other,
        };
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn title(&self) -> Option<String> {
        self.text(keys::TITLE)
    }

    pub fn doi(&self) -> Option<String> {
        self.text(keys::DOI).or_else(|| self.text("DOI"))
    }

    pub fn localfile(&self) -> Option<String> {
        self.text(keys::LOCALFILE)
    }

    pub fn authors(&self) -> Vec<Author> {
        self.0
            .get(keys::AUTHOR)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<Author>(item.clone()).ok())
                    .filter(|author| !author.family.is_empty() || !author.given.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_authors(&mut self, authors: &[Author]) {
        let list = authors
            .iter()
            .filter_map(|author| serde_json::to_value(author).ok())
            .collect::<Vec<_>>();
        self.0.insert(keys::AUTHOR.to_string(), Value::Array(list));
    }

    pub fn tags(&self) -> Vec<String> {
        self.0
            .get(keys::TAG)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The canonical `[year, month, day]`, padding missing parts with 1.
    pub fn date(&self) -> Option<[i64; 3]> {
        let parts = self.0.get(keys::DATE)?.as_array()?;
        let ints = parts.iter().map(Value::as_i64).collect::<Option<Vec<_>>>()?;
        match ints.as_slice() {
            [y] => Some([*y, 1, 1]),
            [y, m] => Some([*y, *m, 1]),
            [y, m, d, ..] => Some([*y, *m, *d]),
            [] => None,
        }
    }

    pub fn set_date(&mut self, date: [i64; 3]) {
        self.0.insert(keys::DATE.to_string(), Value::from(date.to_vec()));
    }

    /// Link objects from the `link` list.
    pub fn links(&self) -> Vec<&Map<String, Value>> {
        self.0
            .get(keys::LINK)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for MetadataRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
