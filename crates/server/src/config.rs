use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use muster_blob::DEFAULT_MAX_BLOB_BYTES;

/// Top-level configuration for the Muster server, loaded from a TOML file.
///
/// Every section and field has a default, so an empty file (or no file at
/// all) yields a working single-node setup with in-memory storage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MusterConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub blob: BlobConfig,
}

/// HTTP server bind configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Blob storage configuration.
///
/// # Example
///
/// ```toml
/// [blob]
/// backend = "fs"
/// root = "/var/lib/muster/blobs"
/// max_upload_bytes = 209715200
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: BlobBackend,
    /// Root directory for the `fs` backend.
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,
    /// Per-file upload ceiling in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            root: default_blob_root(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Supported blob storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// In-memory, non-durable. Good for tests and evaluation.
    #[default]
    Memory,
    /// One file per blob under [`BlobConfig::root`].
    Fs,
}

impl fmt::Display for BlobBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Fs => f.write_str("fs"),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    3000
}

fn default_blob_root() -> PathBuf {
    PathBuf::from("data/blobs")
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_BLOB_BYTES
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl MusterConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
