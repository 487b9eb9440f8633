//! Error types for artfetch
//!
//! This module provides the single error type used across the fetch pipeline:
//! - Coordination failures (lock and permit timeouts, cancellation)
//! - Provider failures (not found, malformed metadata, HTTP status)
//! - Transfer failures (transient network errors, exhausted retries)
//! - Toolchain failures (extraction, encoder exit status, empty re-encode output)
//!
//! Every variant maps to a stable [`ErrorKind`] so callers can translate failures into
//! their own user-facing messages without matching on error text.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for artfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for artfetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.max_concurrent_transfers")
        key: Option<String>,
    },

    /// The per-artwork lock could not be acquired before the deadline
    #[error("timed out after {waited:?} waiting for the lock on artwork {id}")]
    LockTimeout {
        /// Artwork whose lock was contended
        id: String,
        /// How long the caller waited
        waited: Duration,
    },

    /// No transfer permit became available before the deadline
    #[error("timed out after {waited:?} waiting for a transfer permit")]
    GateTimeout {
        /// How long the caller waited
        waited: Duration,
    },

    /// The provider has no artwork with this identifier
    #[error("artwork not found: {0}")]
    MetadataNotFound(String),

    /// The provider answered, but the metadata could not be used
    #[error("invalid artwork metadata: {0}")]
    InvalidMetadata(String),

    /// Invalid artwork identifier supplied by the caller
    #[error("invalid artwork id {0:?}")]
    InvalidArtworkId(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status from the provider or an asset host
    #[error("HTTP {status} for {url}")]
    Http {
        /// Requested URL
        url: String,
        /// HTTP status code returned
        status: u16,
    },

    /// A transfer kept failing with transient errors until the attempt ceiling
    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Requested URL
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// Display form of the final error
        last_error: String,
    },

    /// Archive extraction failed
    #[error("extraction failed for {archive}: {reason}")]
    Extraction {
        /// The archive that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// External tool execution failed (ffmpeg, ffprobe)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// A re-encode finished but left no usable output
    #[error("re-encode produced empty output at {0}")]
    EmptyOutput(PathBuf),

    /// The compressor could not bring an asset under the size budget
    #[error(
        "could not bring {path} under {budget} bytes (still {size} bytes after {iterations} passes)"
    )]
    SizeBudgetExceeded {
        /// Asset being compressed
        path: PathBuf,
        /// Size after the last pass
        size: u64,
        /// Byte budget that had to be met
        budget: u64,
        /// Number of re-encode passes performed
        iterations: u32,
    },

    /// Content store failure
    #[error("cache error: {0}")]
    Cache(String),

    /// The caller abandoned the operation
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation not supported (missing binary, unknown format)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`Error`] for callers that map failures to messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Lock or permit wait expired
    Timeout,
    /// The artwork does not exist upstream
    NotFound,
    /// Upstream answered with something unusable
    BadUpstream,
    /// Network transfer failed
    Network,
    /// Extraction, encoding, or re-encoding failed
    Subprocess,
    /// Size budget could not be met
    TooLarge,
    /// Cancelled by the caller
    Cancelled,
    /// Local configuration or environment problem
    Local,
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Stable classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LockTimeout { .. } | Error::GateTimeout { .. } => ErrorKind::Timeout,
            Error::MetadataNotFound(_) => ErrorKind::NotFound,
            Error::InvalidMetadata(_) | Error::Http { .. } => ErrorKind::BadUpstream,
            Error::Network(_) | Error::RetriesExhausted { .. } => ErrorKind::Network,
            Error::Extraction { .. } | Error::ExternalTool(_) | Error::EmptyOutput(_) => {
                ErrorKind::Subprocess
            }
            Error::SizeBudgetExceeded { .. } => ErrorKind::TooLarge,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config { .. }
            | Error::InvalidArtworkId(_)
            | Error::Cache(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::NotSupported(_)
            | Error::Other(_) => ErrorKind::Local,
        }
    }
}
