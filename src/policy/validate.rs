//! Plausibility checks run before any network call.
//!
//! These are safety floors, not credential checks: whether a token is
//! actually valid is only ever decided by the verification service.

use crate::config::AddressPolicy;
use crate::report::{Notice, NoticeReporter};
use crate::request::parse::RESOURCE_SEGMENTS;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::error;

/// Tokens must be longer than this many characters.
pub const MIN_TOKEN_LENGTH: usize = 10;

/// Resource paths must be longer than the content identifier tree `aa/123/bb/4567`.
pub const MIN_RESOURCE_PATH_LENGTH: usize = "aa/123/bb/4567".len();

/// Shortest address accepted under [`AddressPolicy::Trusting`].
pub const MIN_TRUSTED_ADDRESS_LENGTH: usize = "0.0.0.0".len();

/// Request plausibility checks.
///
/// Each check logs the offending value on failure. A bad client address is
/// also reported, since it comes from the host rather than from the user.
#[derive(Clone)]
pub struct Validator {
    address_policy: AddressPolicy,
    reporter: Arc<dyn NoticeReporter>,
}

impl Validator {
    /// Create a validator with the given address policy.
    pub fn new(address_policy: AddressPolicy, reporter: Arc<dyn NoticeReporter>) -> Self {
        Self {
            address_policy,
            reporter,
        }
    }

    /// Token is present and longer than [`MIN_TOKEN_LENGTH`].
    pub fn is_token_plausible(&self, token: Option<&str>) -> bool {
        match token {
            Some(t) if t.chars().count() > MIN_TOKEN_LENGTH => true,
            Some(t) => {
                error!(token = t, "token missing or implausibly short");
                false
            }
            None => {
                error!("token missing or implausibly short");
                false
            }
        }
    }

    /// Client address is present and passes the configured policy.
    pub fn is_client_address_plausible(&self, address: Option<&str>) -> bool {
        let plausible = match (address, self.address_policy) {
            (Some(addr), AddressPolicy::Strict) => is_dotted_quad(addr),
            (Some(addr), AddressPolicy::Trusting) => addr.len() >= MIN_TRUSTED_ADDRESS_LENGTH,
            (None, _) => false,
        };

        if !plausible {
            let msg = match address {
                Some(addr) => format!("client address missing or invalid: {}", addr),
                None => "client address missing or invalid".to_string(),
            };
            error!(policy = ?self.address_policy, "{}", msg);
            self.reporter.report(Notice::new(msg));
        }
        plausible
    }

    /// Resource path is longer than the identifier tree and has exactly five segments.
    pub fn is_resource_path_plausible(&self, path: Option<&str>) -> bool {
        let path = match path {
            Some(p) if p.len() > MIN_RESOURCE_PATH_LENGTH => p,
            Some(p) => {
                error!(stream_name = p, "stream name missing or implausibly short");
                return false;
            }
            None => {
                error!("stream name missing or implausibly short");
                return false;
            }
        };

        if path.split('/').count() == RESOURCE_SEGMENTS {
            true
        } else {
            error!(stream_name = path, "unable to parse content id and file name from stream name");
            false
        }
    }
}

/// A complete four-octet IPv4 address such as `203.0.113.5`.
///
/// Shorthand forms like `1.1` are rejected.
fn is_dotted_quad(addr: &str) -> bool {
    addr.parse::<Ipv4Addr>().is_ok()
}
