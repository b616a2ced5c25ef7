//! Error types for the collection engine.

use gridwatch_client::ClientError;
use thiserror::Error;

/// Result type alias for collection steps.
pub type CollectResult<T> = Result<T, CollectError>;

/// Errors that abort a scrape, an aggregator, or a single entity.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{context}: {source}")]
    Client {
        context: String,
        #[source]
        source: ClientError,
    },

    #[error("leader is not a host:port but {address}: {reason}")]
    LeaderAddress { address: String, reason: String },

    #[error("client address {address} can't be parsed as a url: {reason}")]
    ClientAddress { address: String, reason: String },

    #[error("agent is not a server")]
    NotAServer,

    #[error("fan-out task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl CollectError {
    /// Wrap a control-plane error with what was being attempted.
    pub fn client(context: impl Into<String>, source: ClientError) -> Self {
        Self::Client {
            context: context.into(),
            source,
        }
    }

    /// The underlying control-plane error, if any.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Client { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised when validating collector configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency must be at least 1, got {0}")]
    Concurrency(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_context_is_kept_in_message() {
        let err = CollectError::client(
            "could not get evaluation metrics",
            ClientError::Status {
                path: "/v1/evaluations".to_string(),
                status: 500,
                body: "boom".to_string(),
            },
        );
        assert!(err.to_string().starts_with("could not get evaluation metrics: "));
        assert_eq!(err.client_error().map(|e| e.kind()), Some("status"));
        assert!(CollectError::NotAServer.client_error().is_none());
    }
}
