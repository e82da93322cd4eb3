//! Streamgate error types.

use thiserror::Error;

/// Errors that can occur while building or performing an authorization check.
///
/// None of these escape [`AuthorizationGateway::authorize`](crate::AuthorizationGateway::authorize):
/// every variant ends in a denial there.
#[derive(Debug, Error)]
pub enum StreamgateError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An assembled verification URL did not parse.
    #[error("Malformed verification URL {url}: {reason}")]
    MalformedUrl {
        /// The URL text that failed to parse.
        url: String,
        /// Parser error description.
        reason: String,
    },

    /// The verification service did not answer within the configured timeouts.
    #[error("Verification service timed out: {0}")]
    VerifierTimeout(String),

    /// HTTP transport error communicating with the verification service.
    #[error("Verification transport error: {0}")]
    VerifierTransport(String),

    /// Notice reporter settings are incomplete.
    #[error("Reporter configuration error: {0}")]
    ReporterConfig(String),
}

impl StreamgateError {
    /// Classify a reqwest failure as a timeout or a generic transport error.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StreamgateError::VerifierTimeout(err.to_string())
        } else {
            StreamgateError::VerifierTransport(err.to_string())
        }
    }
}
