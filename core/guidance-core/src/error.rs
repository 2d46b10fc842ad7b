//! Error types for guidance-core operations.
//! Keep GuidanceFfiError minimal and stable to avoid breaking FFI clients.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for Swift/Kotlin)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type, used both for errors returned to the host and for
/// errors the host's search backend reports back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, uniffi::Error)]
pub enum GuidanceFfiError {
    #[error("{message}")]
    General { message: String },

    #[error("Timed out")]
    TimedOut,
}

impl From<String> for GuidanceFfiError {
    fn from(message: String) -> Self {
        GuidanceFfiError::General { message }
    }
}

impl From<GuidanceError> for GuidanceFfiError {
    fn from(err: GuidanceError) -> Self {
        GuidanceFfiError::General {
            message: err.to_string(),
        }
    }
}

/// A foreign callback that threw something it did not declare.
impl From<uniffi::UnexpectedUniFFICallbackError> for GuidanceFfiError {
    fn from(err: uniffi::UnexpectedUniFFICallbackError) -> Self {
        GuidanceFfiError::General { message: err.reason }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Search Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a search that produced no usable spots.
///
/// Only `Failed` reaches the engine as a failure; `TimedOut` and
/// `Cancelled` are swallowed at the query level. The engine completes a
/// search it abandons itself as `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("Search query timed out")]
    TimedOut,

    #[error("Search failed")]
    Failed,

    #[error("Search cancelled")]
    Cancelled,
}

/// Errors reported by a `PlaceSearchProvider` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Place search request failed: {0}")]
    Request(String),

    #[error("Place search request timed out")]
    TimedOut,

    #[error("Place search request cancelled")]
    Cancelled,
}

impl From<GuidanceFfiError> for ProviderError {
    fn from(err: GuidanceFfiError) -> Self {
        match err {
            GuidanceFfiError::General { message } => ProviderError::Request(message),
            GuidanceFfiError::TimedOut => ProviderError::TimedOut,
        }
    }
}

impl From<ProviderError> for SearchError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Request(_) => SearchError::Failed,
            ProviderError::TimedOut => SearchError::TimedOut,
            ProviderError::Cancelled => SearchError::Cancelled,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum GuidanceError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using GuidanceError.
pub type Result<T> = std::result::Result<T, GuidanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_search_taxonomy() {
        assert_eq!(
            SearchError::from(ProviderError::Request("offline".into())),
            SearchError::Failed
        );
        assert_eq!(
            SearchError::from(ProviderError::TimedOut),
            SearchError::TimedOut
        );
        assert_eq!(
            SearchError::from(ProviderError::Cancelled),
            SearchError::Cancelled
        );
    }

    #[test]
    fn ffi_errors_keep_their_message() {
        let err = GuidanceFfiError::from(GuidanceError::ConfigInvalid("bad radius".into()));
        assert_eq!(err.to_string(), "Configuration invalid: bad radius");

        let from_host = GuidanceFfiError::General {
            message: "MKError 4".into(),
        };
        assert_eq!(
            ProviderError::from(from_host),
            ProviderError::Request("MKError 4".into())
        );
        assert_eq!(
            ProviderError::from(GuidanceFfiError::TimedOut),
            ProviderError::TimedOut
        );
    }
}
