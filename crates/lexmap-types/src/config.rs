//! Configuration loading for lexmap.
//!
//! Layered: defaults -> default config file -> explicit config file -> env vars.
//! The default config file lives at `~/.config/lexmap/config.{toml,json,...}`
//! and environment variables use the `LEXMAP_` prefix (`LEXMAP_MAX_RESULTS`).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TypesError;

/// Smallest writer budget the document store accepts.
pub const MIN_WRITER_MEMORY_MB: usize = 15;

/// Application settings shared by the indexer and searcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory; each record type gets its own index below it
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Memory budget for the index writer in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    /// Analyzer for analyzed fields: "standard", "greek" or a language code
    #[serde(default = "default_analyzer")]
    pub analyzer: String,

    /// Upper bound on hits collected by a single search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Records per page when a request does not say otherwise
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Log level filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_index_path() -> String {
    ProjectDirs::from("", "", "lexmap")
        .map(|p| p.data_local_dir().join("indexes"))
        .unwrap_or_else(|| PathBuf::from("./lexmap-indexes"))
        .to_string_lossy()
        .to_string()
}

fn default_writer_memory_mb() -> usize {
    50
}

fn default_analyzer() -> String {
    "greek".to_string()
}

fn default_max_results() -> usize {
    500
}

fn default_page_size() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            writer_memory_mb: default_writer_memory_mb(),
            analyzer: default_analyzer(),
            max_results: default_max_results(),
            page_size: default_page_size(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// 1. Built-in defaults
    /// 2. `~/.config/lexmap/config.*` (optional)
    /// 3. `cli_config_path` (required when given)
    /// 4. Environment variables (LEXMAP_*)
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "lexmap")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("index_path", default_index_path())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("analyzer", default_analyzer())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("max_results", default_max_results() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("page_size", default_page_size() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // LEXMAP_INDEX_PATH, LEXMAP_MAX_RESULTS, ...
        builder = builder.add_source(Environment::with_prefix("LEXMAP").try_parsing(true));

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.writer_memory_mb < MIN_WRITER_MEMORY_MB {
            return Err(TypesError::Config(format!(
                "writer_memory_mb must be >= {MIN_WRITER_MEMORY_MB}, got {}",
                self.writer_memory_mb
            )));
        }
        if self.max_results == 0 {
            return Err(TypesError::Config("max_results must be > 0".to_string()));
        }
        if self.page_size == 0 {
            return Err(TypesError::Config("page_size must be > 0".to_string()));
        }
        Ok(())
    }

    /// Expand a leading `~/` in index_path to the home directory.
    pub fn expanded_index_path(&self) -> PathBuf {
        if let Some(rest) = self.index_path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.index_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.writer_memory_mb, 50);
        assert_eq!(settings.analyzer, "greek");
        assert_eq!(settings.max_results, 500);
        assert_eq!(settings.page_size, 20);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lexmap.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "max_results = 42").unwrap();
        writeln!(file, "analyzer = \"en\"").unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.max_results, 42);
        assert_eq!(settings.analyzer, "en");
        assert_eq!(settings.page_size, 20);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Settings::load(Some("/nonexistent/lexmap-config.toml"));
        assert!(matches!(result, Err(TypesError::Config(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.writer_memory_mb = 4;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.page_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_expanded_index_path_plain() {
        let settings = Settings {
            index_path: "/var/lib/lexmap".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.expanded_index_path(), PathBuf::from("/var/lib/lexmap"));
    }
}
