//! Configuration model definitions.
//!
//! This module contains the configuration structures for all Kinship components.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Kinship.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KinshipConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Mirror repair and reconciliation configuration
    pub reconciliation: ReconciliationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageEngine {
    /// Process-local `DashMap` store
    Memory,
    /// SurrealDB with the in-memory key-value engine
    SurrealMemory,
    /// SurrealDB persisted with RocksDB under `data_dir`
    #[serde(rename = "rocksdb", alias = "rocks_db")]
    RocksDb,
}

impl fmt::Display for StorageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngine::Memory => write!(f, "memory"),
            StorageEngine::SurrealMemory => write!(f, "surreal_memory"),
            StorageEngine::RocksDb => write!(f, "rocksdb"),
        }
    }
}

impl FromStr for StorageEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageEngine::Memory),
            "surreal_memory" | "surrealmemory" => Ok(StorageEngine::SurrealMemory),
            "rocksdb" | "rocks_db" => Ok(StorageEngine::RocksDb),
            _ => Err(format!("Invalid storage engine: {}", s)),
        }
    }
}

/// Configuration for the user store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to use
    pub engine: StorageEngine,

    /// Base directory for on-disk engines
    pub data_dir: PathBuf,

    /// SurrealDB namespace
    pub namespace: String,

    /// SurrealDB database
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("org", "kinship", "kinship")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./data"));

        Self {
            engine: StorageEngine::RocksDb,
            data_dir,
            namespace: "kinship".to_string(),
            database: "main".to_string(),
        }
    }
}

impl StorageConfig {
    /// Location of the RocksDB files
    pub fn rocksdb_path(&self) -> PathBuf {
        self.data_dir.join("users")
    }
}

/// Configuration for mirror-write retries and lazy repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Reconcile every exposed pair before returning a request/friends listing
    pub reconcile_on_list: bool,

    /// Extra attempts for a mirror write that failed with a transient error
    pub mirror_retry_attempts: u32,

    /// Delay before the first retry; grows linearly with the attempt number
    #[serde(with = "humantime_serde")]
    pub mirror_retry_backoff: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            reconcile_on_list: true,
            mirror_retry_attempts: 2,
            mirror_retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,

    /// Log format
    pub format: LogFormat,

    /// File to log to (if any)
    pub file: Option<PathBuf>,

    /// Whether to log to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Default,
            file: None,
            stdout: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,

    /// Debug level
    Debug,

    /// Info level
    Info,

    /// Warn level
    Warn,

    /// Error level
    Error,
}

// Implement Display for LogLevel
impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

// Implement FromStr for LogLevel
impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Default format
    Default,

    /// JSON format
    Json,

    /// Compact format
    Compact,

    /// Pretty format
    Pretty,
}
