//! Error types for the interim report core.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Every failure the lookup pipeline can surface to its caller.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Token exchange failed or the upstream answered 401. Terminal.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The email is not present in the student snapshot. The caller may ask again.
    #[error("no student found for email '{email}'")]
    Lookup { email: String },

    #[error("invalid email address: '{0}'")]
    InvalidEmail(String),

    /// A hop after identifier resolution produced no usable data.
    #[error("pipeline step '{endpoint}' failed: {reason}")]
    Pipeline { endpoint: String, reason: String },

    #[error("request to '{endpoint}' failed with status {status}")]
    Status { endpoint: String, status: StatusCode },

    /// 429 from upstream, with the time left until the window resets when known.
    #[error("'{endpoint}' is rate limited")]
    RateLimited { endpoint: String, retry_after: Option<Duration> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response from '{endpoint}': {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("student index rebuild already in progress")]
    RebuildInProgress,
}

/// A convenience Result alias that defaults to [`ReportError`].
pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Wrap a failure of one hop of the pipeline. Authentication failures stay
    /// authentication failures so the caller can tell them apart.
    pub fn pipeline(endpoint: impl Into<String>, source: ReportError) -> Self {
        match source {
            ReportError::Auth(_) | ReportError::Pipeline { .. } => source,
            other => ReportError::Pipeline {
                endpoint: endpoint.into(),
                reason: other.to_string(),
            },
        }
    }

    /// Connection problems, timeouts and 5xx answers are worth another attempt.
    /// 429 is not: the fetcher waits for the reported window reset instead.
    pub fn is_transient(&self) -> bool {
        match self {
            ReportError::Http(err) => err.is_timeout() || err.is_connect(),
            ReportError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::Auth(_) => "auth",
            ReportError::Lookup { .. } => "lookup",
            ReportError::InvalidEmail(_) => "invalid_email",
            ReportError::Pipeline { .. } => "pipeline",
            ReportError::Status { .. } => "status",
            ReportError::RateLimited { .. } => "rate_limited",
            ReportError::Http(_) => "http",
            ReportError::Decode { .. } => "decode",
            ReportError::Io(_) => "io",
            ReportError::Serialization(_) => "serialization",
            ReportError::RebuildInProgress => "rebuild_in_progress",
        }
    }
}
