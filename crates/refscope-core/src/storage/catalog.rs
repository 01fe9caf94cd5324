//! Library maintenance: saving curated entries and rebuilding `index.json`.
//!
//! The resolution path only ever reads the library through
//! [`LibraryIndex`](super::library::LibraryIndex); this module is the
//! separate writer used by the command line.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dates::resolve_date;
use crate::error::{CoreError, Result};
use crate::models::{Author, IdKind, Identifier, MetadataRecord, keys};
use crate::storage::library::entry_path;

pub const INDEX_FILE: &str = "index.json";

/// One line of `index.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub date: Vec<i64>,
    pub author: Vec<Author>,
    pub title: String,
    pub journal: String,
    /// `<kind>/<value>` of the entry.
    pub library: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub file: String,
    pub tag: Vec<String>,
    pub note: String,
}

impl IndexSummary {
    pub fn from_record(kind: IdKind, value: &str, record: &MetadataRecord) -> Self {
        let mut summary = Self {
            date: record.date().map(|d| d.to_vec()).unwrap_or_default(),
            author: record.authors(),
            title: record.title().unwrap_or_default(),
            journal: record.text(keys::CONTAINER_TITLE).unwrap_or_default(),
            library: format!("{kind}/{value}"),
            file: record.localfile().unwrap_or_default(),
            tag: record.tags(),
            note: record.text(keys::NOTE).unwrap_or_default(),
            ..Default::default()
        };
        let slot = match kind {
            IdKind::Doi => &mut summary.doi,
            IdKind::Arxiv => &mut summary.arxiv,
            IdKind::Url => &mut summary.url,
        };
        *slot = Some(value.to_string());
        summary
    }
}

pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Write a record as a curated entry and refresh its index line.
    pub fn save_entry(&self, id: &Identifier, record: &MetadataRecord) -> Result<PathBuf> {
        let path = entry_path(&self.root, id).ok_or_else(|| {
            CoreError::InvalidIdentifier(format!("{id} cannot be stored in the library"))
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(record)?)?;

        let mut index = self.load_index()?;
        index.insert(
            id.library_path(),
            IndexSummary::from_record(id.kind(), id.library_value(), record),
        );
        self.write_index(&index)?;
        info!(entry = %id, "library entry saved");
        Ok(path)
    }

    pub fn load_index(&self) -> Result<BTreeMap<String, IndexSummary>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Re-scan every entry, backfill missing dates, and rewrite `index.json`.
    pub fn rebuild_index(&self) -> Result<BTreeMap<String, IndexSummary>> {
        let mut index = BTreeMap::new();

        for kind in IdKind::ALL {
            let kind_dir = self.root.join(kind.as_str());
            if !kind_dir.is_dir() {
                continue;
            }
            let mut files = Vec::new();
            collect_json_files(&kind_dir, &mut files)?;

            for path in files {
                match self.index_entry(kind, &kind_dir, &path) {
                    Ok((value, summary)) => {
                        index.insert(format!("{kind}/{value}"), summary);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping library entry"),
                }
            }
        }

        self.write_index(&index)?;
        info!(entries = index.len(), "library index rebuilt");
        Ok(index)
    }

    fn index_entry(&self, kind: IdKind, kind_dir: &Path, path: &Path) -> Result<(String, IndexSummary)> {
        let value = path
            .strip_prefix(kind_dir)
            .ok()
            .and_then(|rel| rel.to_str())
            .and_then(|rel| rel.strip_suffix(".json"))
            .map(|rel| rel.replace(std::path::MAIN_SEPARATOR, "/"))
            .ok_or_else(|| CoreError::Config(format!("unusable entry path {}", path.display())))?;

        let contents = fs::read_to_string(path)?;
        let mut record: MetadataRecord = serde_json::from_str(&contents)?;
        if record.date().is_none() && resolve_date(&mut record).is_some() {
            fs::write(path, serde_json::to_string_pretty(&record)?)?;
        }

        let summary = IndexSummary::from_record(kind, &value, &record);
        Ok((value, summary))
    }

    fn write_index(&self, index: &BTreeMap<String, IndexSummary>) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.index_path(), serde_json::to_string_pretty(index)?)?;
        Ok(())
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}
