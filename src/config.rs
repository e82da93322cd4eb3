//! Streamgate configuration.
//!
//! Configuration is read once at startup and never mutated afterwards. The
//! gateway takes it by value, so concurrent decisions only ever read it.

use crate::StreamgateError;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Default base URL of the token verification service.
pub const DEFAULT_VERIFICATION_BASE_URL: &str = "http://localhost:3000";

/// Default time allowed to establish a connection to the verification service, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 20;

/// Default time allowed to wait for the verification response once connected, in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 20;

/// Host property holding the verification base URL.
pub const PROP_BASE_URL: &str = "stacksURL";
/// Host property holding the connect timeout in seconds.
pub const PROP_CONNECT_TIMEOUT: &str = "stacksConnectionTimeout";
/// Host property holding the read timeout in seconds.
pub const PROP_READ_TIMEOUT: &str = "stacksReadTimeout";
/// Host property holding the client address policy (`strict` or `trusting`).
pub const PROP_ADDRESS_POLICY: &str = "clientAddressPolicy";

const ENV_BASE_URL: &str = "STREAMGATE_STACKS_URL";
const ENV_CONNECT_TIMEOUT: &str = "STREAMGATE_CONNECT_TIMEOUT";
const ENV_READ_TIMEOUT: &str = "STREAMGATE_READ_TIMEOUT";
const ENV_ADDRESS_POLICY: &str = "STREAMGATE_ADDRESS_POLICY";

/// How much to trust the client address handed over by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressPolicy {
    /// Require a complete dotted-quad IPv4 address (`1.2.3.4`, each octet at most 255).
    #[default]
    Strict,

    /// Only require a plausible length; the transport layer is trusted to
    /// supply a real address.
    Trusting,
}

impl FromStr for AddressPolicy {
    type Err = StreamgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(AddressPolicy::Strict),
            "trusting" => Ok(AddressPolicy::Trusting),
            other => Err(StreamgateError::ConfigError(format!(
                "unknown client address policy: {}",
                other
            ))),
        }
    }
}

/// Configuration for the authorization gateway.
#[derive(Debug, Clone)]
pub struct StreamgateConfig {
    /// Base URL of the token verification service (e.g. "https://stacks.example.edu").
    /// A trailing slash is ignored.
    pub verification_base_url: String,

    /// Time allowed to establish a connection to the verification service.
    pub connect_timeout: Duration,

    /// Time allowed to wait for the verification response after connecting.
    pub read_timeout: Duration,

    /// Client address plausibility policy.
    pub address_policy: AddressPolicy,
}

impl Default for StreamgateConfig {
    fn default() -> Self {
        Self {
            verification_base_url: DEFAULT_VERIFICATION_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            address_policy: AddressPolicy::Strict,
        }
    }
}

impl StreamgateConfig {
    /// Base URL with any trailing slash removed, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.verification_base_url.trim_end_matches('/')
    }

    /// Validate configuration for obvious errors.
    ///
    /// The base URL must be an absolute `http` or `https` URL with a host.
    pub fn validate(&self) -> Result<(), StreamgateError> {
        let parsed = Url::parse(self.base_url()).map_err(|e| {
            StreamgateError::ConfigError(format!(
                "verification base URL {:?} is malformed: {}",
                self.verification_base_url, e
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StreamgateError::ConfigError(format!(
                "verification base URL must be http or https, got scheme {}",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(StreamgateError::ConfigError(format!(
                "verification base URL {:?} has no host",
                self.verification_base_url
            )));
        }
        Ok(())
    }

    /// Replace zero timeouts with their defaults, the same fallback
    /// [`from_properties`](Self::from_properties) applies to values below one second.
    pub fn with_default_timeouts_for_zero(mut self) -> Self {
        if self.connect_timeout.is_zero() {
            warn!("connect timeout is zero; using default");
            self.connect_timeout = Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS);
        }
        if self.read_timeout.is_zero() {
            warn!("read timeout is zero; using default");
            self.read_timeout = Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS);
        }
        self
    }

    /// Build configuration from host properties.
    ///
    /// `lookup` returns the raw property value, or `None` when unset. Missing
    /// values take their defaults; timeouts that do not parse or are below one
    /// second revert to the default. The base URL is taken as-is and checked
    /// later by [`validate`](Self::validate).
    pub fn from_properties<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let verification_base_url = lookup(PROP_BASE_URL)
            .unwrap_or_else(|| DEFAULT_VERIFICATION_BASE_URL.to_string());
        let connect_timeout =
            timeout_property(PROP_CONNECT_TIMEOUT, lookup(PROP_CONNECT_TIMEOUT), DEFAULT_CONNECT_TIMEOUT_SECS);
        let read_timeout =
            timeout_property(PROP_READ_TIMEOUT, lookup(PROP_READ_TIMEOUT), DEFAULT_READ_TIMEOUT_SECS);

        let address_policy = match lookup(PROP_ADDRESS_POLICY) {
            None => AddressPolicy::default(),
            Some(raw) => raw.parse::<AddressPolicy>().unwrap_or_else(|e| {
                warn!(property = PROP_ADDRESS_POLICY, value = %raw, error = %e, "using strict address policy");
                AddressPolicy::default()
            }),
        };

        info!(
            base_url = %verification_base_url,
            connect_timeout_secs = connect_timeout.as_secs(),
            read_timeout_secs = read_timeout.as_secs(),
            address_policy = ?address_policy,
            "loaded streamgate configuration"
        );

        Self {
            verification_base_url,
            connect_timeout,
            read_timeout,
            address_policy,
        }
    }

    /// Build configuration from `STREAMGATE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_properties(|name| {
            let var = match name {
                PROP_BASE_URL => ENV_BASE_URL,
                PROP_CONNECT_TIMEOUT => ENV_CONNECT_TIMEOUT,
                PROP_READ_TIMEOUT => ENV_READ_TIMEOUT,
                PROP_ADDRESS_POLICY => ENV_ADDRESS_POLICY,
                _ => return None,
            };
            std::env::var(var).ok()
        })
    }
}

fn timeout_property(name: &str, raw: Option<String>, default_secs: u64) -> Duration {
    let secs = match raw {
        None => default_secs,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(secs) if secs >= 1 => secs as u64,
            Ok(secs) => {
                warn!(property = name, value = secs, "timeout below one second; using default");
                default_secs
            }
            Err(e) => {
                warn!(property = name, value = %raw, error = %e, "unable to read timeout; using default");
                default_secs
            }
        },
    };
    Duration::from_secs(secs)
}
