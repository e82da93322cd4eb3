//! Adapters for the two host call sites.
//!
//! HTTP streaming sessions (HLS, MPEG-DASH) arrive with headers and a query
//! string; the client address is taken from `X-Forwarded-For`. Byte-stream
//! play events arrive with the client address already resolved, and often
//! carry the query string inside the stream name.

use crate::gateway::{AuthorizationGateway, Decision};
use crate::request::parse::client_ip_from_forwarded_for;
use std::collections::HashMap;
use tracing::{error, info};

/// Status code sent to a play client whose token was refused.
pub const PLAY_FAILED_CODE: &str = "NetStream.Play.Failed";

/// Status description sent to a play client whose token was refused.
pub const PLAY_FAILED_DESCRIPTION: &str = "Rejected due to invalid token";

/// An HTTP streaming session awaiting admission.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    /// Stream name requested by the session.
    pub stream_name: String,
    /// Session query string.
    pub query_string: Option<String>,
    /// Request headers as received by the host.
    pub headers: HashMap<String, String>,
}

impl SessionRequest {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Originating client address from `X-Forwarded-For`, empty when absent.
    pub fn client_address(&self) -> String {
        client_ip_from_forwarded_for(self.header("x-forwarded-for"))
    }
}

/// What the host should do with an HTTP streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Accept the session.
    Accept,
    /// Reject the session.
    Reject,
}

/// A play event on a byte-stream connection.
#[derive(Debug, Clone, Default)]
pub struct PlayRequest {
    /// Resolved stream name (aliases already applied).
    pub stream_name: String,
    /// Connection query string.
    pub query_string: Option<String>,
    /// Client address as reported by the connection.
    pub client_address: Option<String>,
}

impl PlayRequest {
    /// Query string to read the token from.
    ///
    /// Falls back to the stream name when the connection query is missing or
    /// empty, since clients frequently append the token to the stream name.
    pub fn effective_query(&self) -> &str {
        match self.query_string.as_deref() {
            Some(q) if !q.is_empty() => q,
            _ => &self.stream_name,
        }
    }
}

/// What the host should do with a play event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    /// Pass the play call on.
    Play,
    /// Send a failure status with this code and description, then shut the client down.
    Reject {
        /// Status code.
        code: &'static str,
        /// Status description.
        description: &'static str,
    },
    /// Shut the client down without a status.
    Shutdown,
}

impl AuthorizationGateway {
    /// Decide an HTTP streaming session.
    ///
    /// Sessions have no separate shutdown primitive, so a misconfigured
    /// gateway rejects them.
    pub fn authorize_session(&self, session: &SessionRequest) -> SessionAction {
        info!(stream_name = %session.stream_name, "streaming session created");

        let client_address = session.client_address();
        match self.decide_parts(
            Some(session.stream_name.as_str()),
            session.query_string.as_deref(),
            Some(client_address.as_str()),
        ) {
            Decision::Accept => SessionAction::Accept,
            Decision::Reject | Decision::Terminate => SessionAction::Reject,
        }
    }

    /// Decide a play event.
    pub fn authorize_play(&self, play: &PlayRequest) -> PlayAction {
        let query = play.effective_query();
        match self.decide_parts(Some(play.stream_name.as_str()), Some(query), play.client_address.as_deref()) {
            Decision::Accept => PlayAction::Play,
            Decision::Terminate => PlayAction::Shutdown,
            Decision::Reject => {
                error!(
                    stream_name = %play.stream_name,
                    query = query,
                    "failed to authorize stream"
                );
                PlayAction::Reject {
                    code: PLAY_FAILED_CODE,
                    description: PLAY_FAILED_DESCRIPTION,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::http::TokenVerifier;
    use crate::config::StreamgateConfig;
    use crate::report::NoopReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use url::Url;

    const STREAM: &str = "aa/123/bb/4567/mp4:movie.mp4";
    const QUERY: &str = "stacks_token=longenoughtoken123";

    struct CountingVerifier {
        answer: bool,
        calls: AtomicUsize,
        last_url: std::sync::Mutex<Option<String>>,
    }

    impl CountingVerifier {
        fn answering(answer: bool) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
                last_url: std::sync::Mutex::new(None),
            })
        }
    }

    impl TokenVerifier for CountingVerifier {
        fn verify(&self, url: &Url) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().unwrap() = Some(url.to_string());
            self.answer
        }
    }

    fn gateway_with(verifier: Arc<CountingVerifier>, base_url: &str) -> AuthorizationGateway {
        let config = StreamgateConfig {
            verification_base_url: base_url.to_string(),
            ..StreamgateConfig::default()
        };
        AuthorizationGateway::with_verifier(config, verifier, Arc::new(NoopReporter))
    }

    fn session(forwarded_for: Option<&str>) -> SessionRequest {
        let mut headers = HashMap::new();
        if let Some(value) = forwarded_for {
            headers.insert("X-Forwarded-For".to_string(), value.to_string());
        }
        SessionRequest {
            stream_name: STREAM.to_string(),
            query_string: Some(QUERY.to_string()),
            headers,
        }
    }

    #[test]
    fn test_session_header_lookup_is_case_insensitive() {
        let s = session(Some("203.0.113.5, 10.0.0.1"));
        assert_eq!(s.header("x-forwarded-for"), Some("203.0.113.5, 10.0.0.1"));
        assert_eq!(s.client_address(), "203.0.113.5");
        assert_eq!(session(None).client_address(), "");
    }

    #[test]
    fn test_session_accepted() {
        let verifier = CountingVerifier::answering(true);
        let gw = gateway_with(verifier.clone(), "http://localhost:3000");

        assert_eq!(gw.authorize_session(&session(Some("203.0.113.5, 10.0.0.1"))), SessionAction::Accept);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
        let url = verifier.last_url.lock().unwrap().clone().unwrap();
        assert!(url.ends_with("user_ip=203.0.113.5"));
    }

    #[test]
    fn test_session_rejected_by_verifier() {
        let verifier = CountingVerifier::answering(false);
        let gw = gateway_with(verifier.clone(), "http://localhost:3000");

        assert_eq!(gw.authorize_session(&session(Some("203.0.113.5"))), SessionAction::Reject);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_session_without_forwarded_for_rejected() {
        let verifier = CountingVerifier::answering(true);
        let gw = gateway_with(verifier.clone(), "http://localhost:3000");

        assert_eq!(gw.authorize_session(&session(None)), SessionAction::Reject);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_session_rejected_when_misconfigured() {
        let verifier = CountingVerifier::answering(true);
        let gw = gateway_with(verifier.clone(), "badUrl");

        assert_eq!(gw.authorize_session(&session(Some("203.0.113.5"))), SessionAction::Reject);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_play_effective_query_fallback() {
        let mut play = PlayRequest {
            stream_name: format!("{}?{}", STREAM, QUERY),
            query_string: None,
            client_address: Some("203.0.113.5".to_string()),
        };
        assert_eq!(play.effective_query(), play.stream_name.as_str());

        play.query_string = Some(String::new());
        assert_eq!(play.effective_query(), play.stream_name.as_str());

        play.query_string = Some(QUERY.to_string());
        assert_eq!(play.effective_query(), QUERY);
    }

    #[test]
    fn test_play_allowed_with_token_in_stream_name() {
        let verifier = CountingVerifier::answering(true);
        let gw = gateway_with(verifier.clone(), "http://localhost:3000");
        let play = PlayRequest {
            stream_name: format!("{}?{}", STREAM, QUERY),
            query_string: None,
            client_address: Some("203.0.113.5".to_string()),
        };

        assert_eq!(gw.authorize_play(&play), PlayAction::Play);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_play_rejected_with_status() {
        let verifier = CountingVerifier::answering(false);
        let gw = gateway_with(verifier, "http://localhost:3000");
        let play = PlayRequest {
            stream_name: STREAM.to_string(),
            query_string: Some(QUERY.to_string()),
            client_address: Some("203.0.113.5".to_string()),
        };

        assert_eq!(
            gw.authorize_play(&play),
            PlayAction::Reject {
                code: PLAY_FAILED_CODE,
                description: PLAY_FAILED_DESCRIPTION,
            }
        );
    }

    #[test]
    fn test_play_shutdown_when_misconfigured() {
        let verifier = CountingVerifier::answering(true);
        let gw = gateway_with(verifier.clone(), "");
        let play = PlayRequest {
            stream_name: STREAM.to_string(),
            query_string: Some(QUERY.to_string()),
            client_address: Some("203.0.113.5".to_string()),
        };

        assert_eq!(gw.authorize_play(&play), PlayAction::Shutdown);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }
}
