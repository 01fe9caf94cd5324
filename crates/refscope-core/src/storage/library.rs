use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::models::{Identifier, MetadataRecord};

/// Read-only access to curated records.
///
/// Every failure to produce a record is reported as `CoreError::NotFound`.
#[async_trait]
pub trait LibraryIndex: Send + Sync {
    async fn lookup(&self, id: &Identifier) -> Result<MetadataRecord>;
}

/// A library laid out on disk as `<root>/<kind>/<value>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Document path for an identifier, or `None` if the value would
    /// resolve outside the library root.
    pub fn entry_path(&self, id: &Identifier) -> Option<PathBuf> {
        entry_path(&self.root, id)
    }
}

pub(crate) fn entry_path(root: &Path, id: &Identifier) -> Option<PathBuf> {
    let relative = PathBuf::from(format!("{}.json", id.library_path()));
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    (!escapes).then(|| root.join(relative))
}

#[async_trait]
impl LibraryIndex for DirectoryLibrary {
    async fn lookup(&self, id: &Identifier) -> Result<MetadataRecord> {
        let not_found = || CoreError::NotFound(format!("{id} is not in the library"));

        let path = self.entry_path(id).ok_or_else(not_found)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "library entry unreadable");
                return Err(not_found());
            }
        };

        match serde_json::from_slice::<MetadataRecord>(&bytes) {
            Ok(record) => Ok(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "library entry is not a JSON object");
                Err(not_found())
            }
        }
    }
}
