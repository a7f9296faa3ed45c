//! Error types for DocRelay.
//!
//! Library crates use [`DocRelayError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// One upstream retrieval attempt, recorded for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FetchAttempt {
    /// The URL that was requested.
    pub url: String,
    /// The HTTP status the upstream returned.
    pub status: u16,
}

/// Top-level error type for all DocRelay operations.
#[derive(Debug, thiserror::Error)]
pub enum DocRelayError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure (DNS, connect, timeout) before any status.
    #[error("network error: {0}")]
    Network(String),

    /// A required upstream retrieval returned a non-success status.
    #[error("upstream fetch failed: {url} returned HTTP {status}")]
    UpstreamFetch {
        url: String,
        status: u16,
        /// For Markdown lookups, the other variant that was also tried.
        fallback: Option<FetchAttempt>,
    },

    /// Sidebar payload was present but not parseable as the expected envelope.
    #[error("sidebar parse failed: {message}")]
    SidebarParse { message: String },

    /// Data validation error (bad URL, bad package coordinates, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocRelayError>;

impl DocRelayError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a sidebar-parse error from any displayable message.
    pub fn sidebar_parse(msg: impl Into<String>) -> Self {
        Self::SidebarParse {
            message: msg.into(),
        }
    }

    /// Record a failed upstream retrieval.
    pub fn upstream(url: impl Into<String>, status: u16) -> Self {
        Self::UpstreamFetch {
            url: url.into(),
            status,
            fallback: None,
        }
    }

    /// Record a failed retrieval together with the fallback attempt that also failed.
    pub fn upstream_with_fallback(
        url: impl Into<String>,
        status: u16,
        fallback: FetchAttempt,
    ) -> Self {
        Self::UpstreamFetch {
            url: url.into(),
            status,
            fallback: Some(fallback),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Suggested HTTP status for the wrapper's own response to this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UpstreamFetch { .. } | Self::Network(_) => 502,
            Self::Validation { .. } => 400,
            _ => 500,
        }
    }
}
