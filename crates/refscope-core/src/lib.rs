pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{AppConfig, CoreConfig, NetworkConfig};
pub use dates::{DATE_SOURCE_KEYS, resolve_date};
pub use error::{CoreError, Result};
pub use models::*;

pub use storage::cache::CacheStore;
pub use storage::catalog::{Catalog, IndexSummary};
pub use storage::kv::{KeyValueStore, MemoryKvStore, SqliteKvStore};
pub use storage::library::{DirectoryLibrary, LibraryIndex};
