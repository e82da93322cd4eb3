//! Verification service client.

pub mod escape;
pub mod http;
