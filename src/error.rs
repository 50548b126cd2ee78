use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single exchange call (session bootstrap or data query).
///
/// Cloneable so that one failed fetch can be handed to every caller that
/// waited on it.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("Request failed: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    #[error("Upstream returned status {0}")]
    Status(StatusCode),

    #[error("Upstream returned an empty payload")]
    EmptyPayload,

    #[error("Failed to decode upstream payload: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    #[error("Bootstrap response carried no session cookie")]
    NoSessionCookie,

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Http(Arc::new(e))
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(e: serde_json::Error) -> Self {
        UpstreamError::Decode(Arc::new(e))
    }
}

impl UpstreamError {
    /// The origin rejected our credentials; the session has to be replaced.
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            UpstreamError::Status(status)
                if *status == StatusCode::FORBIDDEN || *status == StatusCode::UNAUTHORIZED
        )
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Unexpected upstream payload: {0}")]
    MalformedPayload(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_statuses() {
        assert!(UpstreamError::Status(StatusCode::FORBIDDEN).is_forbidden());
        assert!(UpstreamError::Status(StatusCode::UNAUTHORIZED).is_forbidden());
        assert!(!UpstreamError::Status(StatusCode::BAD_GATEWAY).is_forbidden());
        assert!(!UpstreamError::EmptyPayload.is_forbidden());
    }
}
