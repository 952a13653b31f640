//! resource::error
//!
//! Errors from resolving and invoking remote resources.

use thiserror::Error;

use crate::cache::CacheError;

/// Errors from resource invocation.
///
/// Every variant except `Api`, `Transport` and `Decode` is raised before any
/// network I/O happens.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The client was used in a way that can never succeed, such as invoking
    /// the root resource.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A declared required parameter was not supplied.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// No HTTP method is declared for the endpoint and none was supplied.
    #[error("interface is not defined for '{0}', you must pass `method` (HTTP method)")]
    InterfaceNotDefined(String),

    /// The remote API answered with a non-success status.
    #[error("{code}: {message}")]
    Api {
        /// Upstream error code
        code: i64,
        /// Upstream error message
        message: String,
    },

    /// Network or connection failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A success response whose body could not be parsed.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Cache failure surfaced through a cache-aside read.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ClientError {
    /// Whether this error was raised before the request left the process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::Configuration(_)
                | ClientError::MissingArgument(_)
                | ClientError::InterfaceNotDefined(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = ClientError::Api {
            code: 2,
            message: "Invalid argument, 'forum': Unable to find forum".into(),
        };
        assert_eq!(
            err.to_string(),
            "2: Invalid argument, 'forum': Unable to find forum"
        );
    }

    #[test]
    fn local_errors() {
        assert!(ClientError::MissingArgument("x".into()).is_local());
        assert!(ClientError::InterfaceNotDefined("x".into()).is_local());
        assert!(!ClientError::Transport("reset".into()).is_local());
    }

    #[test]
    fn cache_error_converts() {
        let err: ClientError = CacheError::Closed.into();
        assert!(matches!(err, ClientError::Cache(CacheError::Closed)));
    }
}
