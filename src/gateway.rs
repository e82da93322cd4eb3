//! Authorization gateway - the main public API for Streamgate.
//!
//! The `AuthorizationGateway` turns one stream request into one decision:
//! 1. Extract the token, content id and file name
//! 2. Check token, client address and stream name plausibility
//! 3. Build the verification URL
//! 4. Ask the verification service, once
//!
//! The first failing step denies. A gateway built from a bad base URL
//! denies everything with [`Decision::Terminate`].

use crate::client::http::{build_verification_url, TokenVerifier, VerificationClient};
use crate::config::StreamgateConfig;
use crate::policy::validate::Validator;
use crate::report::{Notice, NoticeReporter};
use crate::request::parse::{extract_token, ResourceIdentity};
use crate::StreamgateError;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of one authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Serve the stream.
    Accept,
    /// Refuse this request; the connection may stay up.
    Reject,
    /// The gateway is misconfigured; close the underlying connection.
    Terminate,
}

impl Decision {
    /// Whether the stream may be served.
    pub fn is_accept(self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Raw inputs for one authorization decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Stream name, e.g. `aa/123/bb/4567/mp4:movie.mp4`.
    pub resource_path: Option<String>,
    /// Query string, or a full `path?query` string.
    pub query_string: Option<String>,
    /// Client network address.
    pub client_address: Option<String>,
}

/// Token authorization gateway.
///
/// Create one instance at startup and share it across request handlers;
/// it holds no per-request state.
pub struct AuthorizationGateway {
    config: StreamgateConfig,
    config_error: Option<String>,
    validator: Validator,
    verifier: Arc<dyn TokenVerifier>,
    reporter: Arc<dyn NoticeReporter>,
}

impl AuthorizationGateway {
    /// Create a gateway that verifies tokens over HTTP.
    ///
    /// A malformed base URL does not fail construction: it is logged and
    /// reported, and the gateway then answers every request with
    /// [`Decision::Terminate`].
    ///
    /// Zero timeouts are replaced by their defaults.
    ///
    /// # Errors
    /// Returns an error only if the HTTP client cannot be created.
    pub fn new(
        config: StreamgateConfig,
        reporter: Arc<dyn NoticeReporter>,
    ) -> Result<Self, StreamgateError> {
        let config = config.with_default_timeouts_for_zero();
        let verifier = Arc::new(VerificationClient::new(&config, reporter.clone())?);
        Ok(Self::with_verifier(config, verifier, reporter))
    }

    /// Create a gateway around a custom verifier.
    pub fn with_verifier(
        config: StreamgateConfig,
        verifier: Arc<dyn TokenVerifier>,
        reporter: Arc<dyn NoticeReporter>,
    ) -> Self {
        let config = config.with_default_timeouts_for_zero();
        let config_error = match config.validate() {
            Ok(()) => {
                info!(
                    base_url = config.base_url(),
                    connect_timeout_secs = config.connect_timeout.as_secs(),
                    read_timeout_secs = config.read_timeout.as_secs(),
                    "verification service configured"
                );
                None
            }
            Err(e) => {
                error!(error = %e, "unable to initialize gateway due to bad stacksURL");
                reporter.report(Notice::new("unable to initialize gateway due to bad stacksURL").with_cause(&e));
                Some(e.to_string())
            }
        };

        Self {
            validator: Validator::new(config.address_policy, reporter.clone()),
            config,
            config_error,
            verifier,
            reporter,
        }
    }

    /// Whether the configuration was valid at startup.
    pub fn is_configured(&self) -> bool {
        self.config_error.is_none()
    }

    /// Get the current configuration.
    pub fn config(&self) -> &StreamgateConfig {
        &self.config
    }

    /// Authorize a request, returning `true` only if every step succeeded.
    pub fn authorize(
        &self,
        resource_path: &str,
        query_string: Option<&str>,
        client_address: Option<&str>,
    ) -> bool {
        self.decide_parts(Some(resource_path), query_string, client_address)
            .is_accept()
    }

    /// Full decision for a request, distinguishing misconfiguration from denial.
    pub fn decide(&self, request: &AuthorizationRequest) -> Decision {
        self.decide_parts(
            request.resource_path.as_deref(),
            request.query_string.as_deref(),
            request.client_address.as_deref(),
        )
    }

    pub(crate) fn decide_parts(
        &self,
        resource_path: Option<&str>,
        query_string: Option<&str>,
        client_address: Option<&str>,
    ) -> Decision {
        if let Some(reason) = &self.config_error {
            error!(
                stream_name = resource_path.unwrap_or(""),
                reason = %reason,
                "rejecting due to invalid stacksURL configuration"
            );
            return Decision::Terminate;
        }

        let token = extract_token(query_string);

        if !(self.validator.is_token_plausible(token.as_deref())
            && self.validator.is_client_address_plausible(client_address)
            && self.validator.is_resource_path_plausible(resource_path))
        {
            return Decision::Reject;
        }

        // All three were checked present above.
        let (Some(token), Some(client_address), Some(resource_path)) =
            (token, client_address, resource_path)
        else {
            return Decision::Reject;
        };

        let Some(identity) = ResourceIdentity::from_path(resource_path) else {
            error!(stream_name = resource_path, "can't parse content id or file name from stream name");
            return Decision::Reject;
        };
        debug!(
            stream_name = resource_path,
            client_address,
            content_id = %identity.content_id,
            file_name = %identity.file_name,
            "parsed stream request"
        );

        let url = match build_verification_url(
            &token,
            &identity.content_id,
            &identity.file_name,
            client_address,
            self.config.base_url(),
        ) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "bad URL for stacks_token verification");
                self.reporter
                    .report(Notice::new("bad URL for stacks_token verification").with_cause(&e));
                return Decision::Reject;
            }
        };

        if self.verifier.verify(&url) {
            Decision::Accept
        } else {
            Decision::Reject
        }
    }
}
