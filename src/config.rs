use crate::error::ConfigError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that points at an alternate config file.
pub const CONFIG_ENV: &str = "DRIVE_UPLOADER_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "uploader.json";

/// Resumable uploads require chunks in multiples of 256 KiB.
pub const CHUNK_ALIGNMENT: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    pub client_secrets_path: PathBuf,
    pub token_path: PathBuf,
    pub chunk_size: usize,
    pub poll_interval_ms: u64,
    pub api_base: String,
    pub upload_base: String,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            client_secrets_path: PathBuf::from("client_secrets.json"),
            token_path: PathBuf::from("token.json"),
            chunk_size: 8 * 1024 * 1024,
            poll_interval_ms: 100,
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl UploaderConfig {
    /// Reads the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; falling back to defaults", e);
                Self::default()
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Chunk size rounded up to the nearest multiple of [`CHUNK_ALIGNMENT`].
    pub fn aligned_chunk_size(&self) -> usize {
        let chunks = self.chunk_size.max(1).div_ceil(CHUNK_ALIGNMENT);
        chunks * CHUNK_ALIGNMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = UploaderConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, UploaderConfig::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploader.json");
        fs::write(&path, r#"{ "token_path": "/tmp/tok.json", "poll_interval_ms": 250 }"#).unwrap();

        let config = UploaderConfig::load(&path).unwrap();
        assert_eq!(config.token_path, PathBuf::from("/tmp/tok.json"));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.chunk_size, UploaderConfig::default().chunk_size);
    }

    #[test]
    fn malformed_file_is_an_error_but_load_or_default_recovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploader.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            UploaderConfig::load(&path),
            Err(ConfigError::Json { .. })
        ));
        assert_eq!(
            UploaderConfig::load_or_default(&path),
            UploaderConfig::default()
        );
    }

    #[test]
    fn chunk_size_is_aligned_up() {
        let config = UploaderConfig {
            chunk_size: 300_000,
            ..Default::default()
        };
        assert_eq!(config.aligned_chunk_size(), 2 * CHUNK_ALIGNMENT);

        let config = UploaderConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(config.aligned_chunk_size(), CHUNK_ALIGNMENT);
    }
}
