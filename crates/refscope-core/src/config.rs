use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/refscope/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Directory holding the metadata cache database.
    pub data_dir: String,
    /// Root of the curated library (`<kind>/<value>.json` documents).
    pub library_path: String,
}

/// Settings shared by every outgoing metadata request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub user_agent: String,
    /// Header that marks a request as an internal lookup, so interception
    /// layers do not trigger another resolution for it.
    pub lookup_header: String,
    pub lookup_header_value: String,
    pub doi_base_url: String,
    pub arxiv_api_url: String,
    pub min_interval_ms: u64,
    pub max_retries: u32,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("refscope");

        Self {
            library_path: data_dir.join("library").to_string_lossy().to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: "refscope/0.1".to_string(),
            lookup_header: "X-Refscope-Lookup".to_string(),
            lookup_header_value: "1".to_string(),
            doi_base_url: "https://doi.org".to_string(),
            arxiv_api_url: "https://export.arxiv.org/api/query".to_string(),
            min_interval_ms: 300,
            max_retries: 2,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/refscope/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("REFSCOPE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("refscope")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(path) = std::env::var("REFSCOPE_LIBRARY_PATH") {
            config.core.library_path = path;
        }
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Path to the SQLite cache file.
    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(&self.core.data_dir).join("cache.db")
    }

    pub fn library_root(&self) -> PathBuf {
        PathBuf::from(&self.core.library_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.network.doi_base_url, "https://doi.org");
        assert_eq!(cfg.network.lookup_header, "X-Refscope-Lookup");
        assert!(!cfg.core.data_dir.is_empty());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.network.max_retries = 7;
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.network.max_retries, 7);
        assert_eq!(loaded.core.library_path, cfg.core.library_path);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\nuser_agent = \"tester/1.0\"\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.network.user_agent, "tester/1.0");
        assert_eq!(loaded.network.lookup_header_value, "1");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_refscope_config.toml")).unwrap();
        assert_eq!(cfg.network.arxiv_api_url, "https://export.arxiv.org/api/query");
    }

    #[test]
    fn test_derived_paths() {
        let cfg = AppConfig::default();
        assert!(cfg.cache_path().to_string_lossy().ends_with("cache.db"));
        assert!(cfg.library_root().to_string_lossy().contains("library"));
    }
}
