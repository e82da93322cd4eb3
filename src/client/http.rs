//! Reqwest-based client for the token verification service.
//!
//! The service answers `HEAD {base}/media/{content_id}/{file_name}/verify_token`
//! with `200 OK` when the token grants access to that file from that client
//! address. Anything else, including a timeout, is a denial.

use crate::client::escape::{escape_form_param, escape_path_segment};
use crate::config::StreamgateConfig;
use crate::report::{Notice, NoticeReporter};
use crate::request::parse::is_dot_segment;
use crate::StreamgateError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

/// Result of a completed verification round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The service answered `200 OK`.
    Authorized,
    /// The service answered with any other status.
    Denied,
}

impl VerificationOutcome {
    /// Whether access was granted.
    pub fn is_authorized(self) -> bool {
        matches!(self, VerificationOutcome::Authorized)
    }
}

/// Something that can check a verification URL.
///
/// Implementations must fail closed: any error is `false`.
pub trait TokenVerifier: Send + Sync {
    /// Perform one verification request. No retries.
    fn verify(&self, url: &Url) -> bool;
}

/// Assemble the verification URL for one request.
///
/// `content_id` and `file_name` are path-escaped; `token` and
/// `client_address` are form-escaped.
///
/// # Errors
/// `MalformedUrl` if the result does not parse, e.g. when `base_url` has no
/// scheme, or if `content_id` or `file_name` is `.` or `..`. URL parsing
/// resolves dot segments (escaped or not), which would move the request to
/// another path.
pub fn build_verification_url(
    token: &str,
    content_id: &str,
    file_name: &str,
    client_address: &str,
    base_url: &str,
) -> Result<Url, StreamgateError> {
    if let Some(segment) = [content_id, file_name].into_iter().find(|s| is_dot_segment(s)) {
        return Err(StreamgateError::MalformedUrl {
            url: format!("{}/media/{}/{}/verify_token", base_url, content_id, file_name),
            reason: format!("dot path segment {:?}", segment),
        });
    }

    let full = format!(
        "{}/media/{}/{}/verify_token?stacks_token={}&user_ip={}",
        base_url,
        escape_path_segment(content_id),
        escape_path_segment(file_name),
        escape_form_param(token),
        escape_form_param(client_address),
    );

    Url::parse(&full).map_err(|e| StreamgateError::MalformedUrl {
        url: full,
        reason: e.to_string(),
    })
}

/// Build a User-Agent string.
///
/// Format: `streamgate/<version>`
pub fn build_user_agent() -> String {
    format!("streamgate/{}", env!("CARGO_PKG_VERSION"))
}

/// HTTP client for the verification service.
pub struct VerificationClient {
    client: Client,
    base_url: String,
    reporter: Arc<dyn NoticeReporter>,
}

impl VerificationClient {
    /// Create a client from config.
    ///
    /// The connect timeout bounds connection setup; the whole request is
    /// bounded by connect plus read timeout.
    pub fn new(
        config: &StreamgateConfig,
        reporter: Arc<dyn NoticeReporter>,
    ) -> Result<Self, StreamgateError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(total_timeout(config.connect_timeout, config.read_timeout))
            .user_agent(build_user_agent())
            .build()
            .map_err(|e| StreamgateError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            reporter,
        })
    }

    /// Send the HEAD request and classify the status.
    ///
    /// # Errors
    /// - `VerifierTimeout` - connect or read timeout expired
    /// - `VerifierTransport` - any other transport failure
    pub fn check(&self, url: &Url) -> Result<VerificationOutcome, StreamgateError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .map_err(StreamgateError::from_transport)?;

        let status = response.status();
        info!(url = %url, status = status.as_u16(), "sent verify_token request");

        if status == StatusCode::OK {
            Ok(VerificationOutcome::Authorized)
        } else {
            Ok(VerificationOutcome::Denied)
        }
    }

    /// Get the base URL requests are built against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TokenVerifier for VerificationClient {
    fn verify(&self, url: &Url) -> bool {
        match self.check(url) {
            Ok(outcome) => outcome.is_authorized(),
            Err(e) => {
                error!(url = %url, error = %e, "unable to verify stacks token");
                self.reporter.report(
                    Notice::new(format!("unable to verify stacks token at {}", url)).with_cause(&e),
                );
                false
            }
        }
    }
}

fn total_timeout(connect: Duration, read: Duration) -> Duration {
    connect.saturating_add(read)
}
