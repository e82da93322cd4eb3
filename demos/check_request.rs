//! Authorize a single stream request from the command line.
//!
//! # Running
//!
//! ```bash
//! export STREAMGATE_STACKS_URL="http://localhost:3000"
//! cargo run --example check_request -- \
//!     "aa/123/bb/4567/mp4:movie.mp4" "stacks_token=longenoughtoken123" "203.0.113.5"
//! ```
//!
//! Exit status is 0 when the request is accepted, 1 when it is rejected and
//! 2 when the gateway is misconfigured.

use std::process::ExitCode;
use streamgate::report::reporter_from_env;
use streamgate::{AuthorizationGateway, AuthorizationRequest, Decision, StreamgateConfig};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let request = AuthorizationRequest {
        resource_path: args.next(),
        query_string: args.next(),
        client_address: args.next(),
    };

    let config = StreamgateConfig::from_env();
    let gateway = match AuthorizationGateway::new(config, reporter_from_env()) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Unable to start gateway: {}", e);
            return ExitCode::from(2);
        }
    };

    match gateway.decide(&request) {
        Decision::Accept => {
            println!("✓ accepted");
            ExitCode::SUCCESS
        }
        Decision::Reject => {
            println!("✗ rejected");
            ExitCode::from(1)
        }
        Decision::Terminate => {
            println!("✗ terminated (bad configuration)");
            ExitCode::from(2)
        }
    }
}
