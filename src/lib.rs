//! # Streamgate
//!
//! **Token authorization gate for media streaming sessions.**
//!
//! Streamgate decides whether an inbound stream request may be served by
//! checking its access token against a remote verification service. It
//! extracts the token from the query string, checks that the token, client
//! address and stream name are plausible, and then issues a single
//! time-bounded `HEAD` request:
//!
//! ```text
//! HEAD {base}/media/{content_id}/{file_name}/verify_token?stacks_token={token}&user_ip={address}
//! ```
//!
//! `200 OK` admits the stream. Every other outcome denies it.
//!
//! ## Features
//!
//! - **Fail-closed** - timeouts, transport errors and non-200 answers all deny
//! - **No network for bad input** - implausible requests are rejected locally
//! - **Misconfiguration is loud** - a bad base URL terminates every connection
//! - **Injectable seams** - swap the verifier or the notice reporter in tests
//!
//! ## Quickstart
//!
//! ```no_run
//! use streamgate::{AuthorizationGateway, StreamgateConfig, TracingReporter};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), streamgate::StreamgateError> {
//!     let config = StreamgateConfig {
//!         verification_base_url: "https://stacks.example.edu".to_string(),
//!         ..StreamgateConfig::default()
//!     };
//!
//!     let gateway = AuthorizationGateway::new(config, Arc::new(TracingReporter))?;
//!     let allowed = gateway.authorize(
//!         "aa/123/bb/4567/mp4:movie.mp4",
//!         Some("stacks_token=longenoughtoken123"),
//!         Some("203.0.113.5"),
//!     );
//!
//!     println!("allowed: {}", allowed);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! - `verification_base_url` - verification service root (default `http://localhost:3000`)
//! - `connect_timeout` / `read_timeout` - bounds on the verification call (default 20s each)
//! - `address_policy` - `Strict` dotted-quad check or `Trusting` length check
//!
//! See [`StreamgateConfig`] for full documentation.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod config;
pub mod errors;

// Request layer
pub mod request;

// Policy layer
pub mod policy;

// Client layer
pub mod client;

// Reporting
pub mod report;

// Gateway (main public API)
pub mod gateway;

// Host call sites
pub mod host;

// Re-exports for public API
pub use client::http::{TokenVerifier, VerificationClient, VerificationOutcome};
pub use config::{AddressPolicy, StreamgateConfig};
pub use errors::StreamgateError;
pub use gateway::{AuthorizationGateway, AuthorizationRequest, Decision};
pub use host::{PlayAction, PlayRequest, SessionAction, SessionRequest};
pub use report::{Notice, NoticeReporter, NoopReporter, TracingReporter};

#[cfg(any(test, feature = "test-seams"))]
pub use report::RecordingReporter;
