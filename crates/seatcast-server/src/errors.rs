//! Error types for the fallible edges of the server.
//!
//! Business-facing dispatch calls never return errors; these cover startup
//! (strategy resolution, binding, metrics installation) only.

use thiserror::Error;

/// Errors raised while initializing the dispatch context.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The configured strategy key is not in the catalog.
    #[error("unknown delivery strategy '{key}' (available: {available})")]
    UnknownStrategy {
        /// Requested key.
        key: String,
        /// Comma-separated catalog keys.
        available: String,
    },
    /// `init` was called outside a Tokio runtime.
    #[error("dispatch context must be initialized inside a Tokio runtime")]
    NoRuntime,
}

/// Errors raised by the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The server loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
    /// The Prometheus recorder could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_lists_available_keys() {
        let err = DispatchError::UnknownStrategy {
            key: "roles".into(),
            available: "broadcast, observer".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown delivery strategy 'roles' (available: broadcast, observer)"
        );
    }

    #[test]
    fn bind_error_keeps_source() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:1".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("127.0.0.1:1"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
