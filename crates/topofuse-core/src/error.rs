// ── Core error types ──
//
// `CoreError` is the only error a caller of the engine ever sees, and only
// for programmer errors (bad configuration). Data-source problems are
// `SourceError` values carried inside `SourceResult`s and surfaced through
// `FusionMetadata`, never raised.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard errors from `topofuse-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine has been shut down")]
    ShutDown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Why a single source contributed nothing to a fusion cycle.
///
/// Stored in `SourceResult::error` and `FusionMetadata::errors`; it is
/// data, not control flow.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceError {
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("fetch cancelled")]
    Cancelled,

    #[error("source unavailable: {message}")]
    Unavailable { message: String },

    #[error("authentication failed: {message}")]
    Authentication { message: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("malformed response: {message}")]
    Malformed { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<topofuse_api::Error> for SourceError {
    fn from(err: topofuse_api::Error) -> Self {
        match err {
            topofuse_api::Error::Authentication { message } => Self::Authentication { message },
            topofuse_api::Error::Timeout { timeout_secs } => Self::Timeout {
                timeout_ms: timeout_secs.saturating_mul(1000),
            },
            topofuse_api::Error::Transport(ref e) if e.is_timeout() => Self::Timeout {
                timeout_ms: 0,
            },
            topofuse_api::Error::RateLimited { retry_after_secs } => {
                Self::RateLimited { retry_after_secs }
            }
            topofuse_api::Error::Deserialization { message, body: _ } => {
                Self::Malformed { message }
            }
            other @ (topofuse_api::Error::Transport(_)
            | topofuse_api::Error::InvalidUrl(_)
            | topofuse_api::Error::Tls(_)
            | topofuse_api::Error::Status { .. }) => Self::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_rate_limit_maps_to_rate_limited() {
        let err = SourceError::from(topofuse_api::Error::RateLimited {
            retry_after_secs: 5,
        });
        assert_eq!(err, SourceError::RateLimited { retry_after_secs: 5 });
    }

    #[test]
    fn api_status_maps_to_unavailable() {
        let err = SourceError::from(topofuse_api::Error::Status {
            status: 502,
            body: "bad gateway".into(),
        });
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[test]
    fn source_error_serializes_with_kind_tag() {
        let json = serde_json::to_value(SourceError::Cancelled).unwrap_or_default();
        assert_eq!(json["kind"], "cancelled");
    }
}
