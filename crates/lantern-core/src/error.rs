//! Error types for Lantern core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while higher-level code can use `anyhow` for
//! convenient error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using LanternError
pub type Result<T> = std::result::Result<T, LanternError>;

/// Core error types for Lantern operations.
///
/// These errors represent specific failure modes that callers may want to
/// handle differently (e.g., falling back to defaults when the cache file
/// is corrupted).
#[derive(Error, Debug)]
pub enum LanternError {
    // === Cache Errors ===
    /// The cache file is missing or could not be found
    #[error("cache file not found at {path}")]
    CacheNotFound { path: PathBuf },

    /// The cache file exists but is corrupted or unreadable
    #[error("cache file is corrupted: {reason}")]
    CacheCorrupted { reason: String },

    // === Index Errors ===
    /// A root with the same canonical path is already indexed
    #[error("root is already indexed: {root}")]
    DuplicateRoot { root: String },

    /// A configured root path does not exist or cannot be read
    #[error("root unavailable: {root}: {reason}")]
    RootUnavailable { root: String, reason: String },

    // === Filter Errors ===
    /// Invalid filter pattern (e.g., bad glob)
    #[error("invalid filter pattern: {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // === Watch Errors ===
    /// Filesystem watch registration failed
    #[error("watch error: {reason}")]
    WatchError { reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LanternError {
    /// Returns true if this error degrades to an in-memory rebuild rather
    /// than aborting operation (cache loss is never fatal).
    pub fn is_cache_loss(&self) -> bool {
        matches!(
            self,
            LanternError::CacheNotFound { .. } | LanternError::CacheCorrupted { .. }
        )
    }

    /// Create a root-unavailable error
    pub fn root_unavailable(root: impl Into<String>, reason: impl Into<String>) -> Self {
        LanternError::RootUnavailable {
            root: root.into(),
            reason: reason.into(),
        }
    }

    /// Create a watch error
    pub fn watch(reason: impl Into<String>) -> Self {
        LanternError::WatchError {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LanternError {
    fn from(err: serde_json::Error) -> Self {
        LanternError::Serialization(err.to_string())
    }
}
