//! Error types for control-plane calls.

use thiserror::Error;

/// Result type alias for control-plane calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the control plane.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid control-plane address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build request for {path}: {reason}")]
    Request { path: String, reason: String },

    #[error("request to {path} failed: {reason}")]
    Transport { path: String, reason: String },

    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Short label naming the failure class, used as the `type` label of
    /// the client error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "invalid_address",
            Self::Request { .. } => "request",
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Decode { .. } => "decode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_stable() {
        let err = ClientError::Status {
            path: "/v1/nodes".to_string(),
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.kind(), "status");
        assert_eq!(err.to_string(), "/v1/nodes returned HTTP 500: boom");

        let err = ClientError::Transport {
            path: "/v1/status/leader".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn decode_error_keeps_source() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = ClientError::Decode {
            path: "/v1/jobs".to_string(),
            source,
        };
        assert_eq!(err.kind(), "decode");
        assert!(std::error::Error::source(&err).is_some());
    }
}
