//! End-to-end authorization against a mock verification service.

use httpmock::prelude::*;
use httpmock::Method::HEAD;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use streamgate::{
    AuthorizationGateway, Notice, NoticeReporter, PlayAction, PlayRequest, SessionAction, SessionRequest,
    StreamgateConfig,
};

const PATH: &str = "aa/123/bb/4567/movie.mp4";
const QUERY: &str = "stacks_token=longenoughtoken123";
const ADDRESS: &str = "203.0.113.5";
const VERIFY_PATH: &str = "/media/aa123bb4567/movie.mp4/verify_token";

#[derive(Default)]
struct Recorder {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeReporter for Recorder {
    fn report(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

fn gateway(server: &MockServer, read_timeout: Duration) -> (AuthorizationGateway, Arc<Recorder>) {
    let config = StreamgateConfig {
        verification_base_url: server.base_url(),
        connect_timeout: Duration::from_secs(1),
        read_timeout,
        ..StreamgateConfig::default()
    };
    let recorder = Arc::new(Recorder::default());
    let gateway = AuthorizationGateway::new(config, recorder.clone()).unwrap();
    (gateway, recorder)
}

#[test]
fn accepts_when_service_returns_ok() {
    let server = MockServer::start();
    let verify = server.mock(|when, then| {
        when.method(HEAD)
            .path(VERIFY_PATH)
            .query_param("stacks_token", "longenoughtoken123")
            .query_param("user_ip", ADDRESS);
        then.status(200);
    });

    let (gw, recorder) = gateway(&server, Duration::from_secs(5));
    assert!(gw.authorize(PATH, Some(QUERY), Some(ADDRESS)));
    verify.assert_calls(1);
    assert!(recorder.notices.lock().unwrap().is_empty());
}

#[test]
fn rejects_when_service_returns_forbidden() {
    let server = MockServer::start();
    let verify = server.mock(|when, then| {
        when.method(HEAD).path(VERIFY_PATH);
        then.status(403);
    });

    let (gw, _) = gateway(&server, Duration::from_secs(5));
    assert!(!gw.authorize(PATH, Some(QUERY), Some(ADDRESS)));
    verify.assert_calls(1);
}

#[test]
fn four_segment_path_makes_no_outbound_call() {
    let server = MockServer::start();
    let verify = server.mock(|when, then| {
        when.method(HEAD);
        then.status(200);
    });

    let (gw, _) = gateway(&server, Duration::from_secs(5));
    assert!(!gw.authorize("aa/123/bb/movie.mp4", Some(QUERY), Some(ADDRESS)));
    verify.assert_calls(0);
}

#[test]
fn short_token_makes_no_outbound_call() {
    let server = MockServer::start();
    let verify = server.mock(|when, then| {
        when.method(HEAD);
        then.status(200);
    });

    let (gw, _) = gateway(&server, Duration::from_secs(5));
    assert!(!gw.authorize(PATH, Some("stacks_token=short"), Some(ADDRESS)));
    verify.assert_calls(0);
}

#[test]
fn read_timeout_denies_without_panicking() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(HEAD).path(VERIFY_PATH);
        then.status(200).delay(Duration::from_secs(4));
    });

    let (gw, recorder) = gateway(&server, Duration::from_secs(1));
    assert!(!gw.authorize(PATH, Some(QUERY), Some(ADDRESS)));

    let notices = recorder.notices.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains(VERIFY_PATH));
}

#[test]
fn session_and_play_call_sites() {
    let server = MockServer::start();
    let verify = server.mock(|when, then| {
        when.method(HEAD).path(VERIFY_PATH).query_param("user_ip", ADDRESS);
        then.status(200);
    });
    let (gw, _) = gateway(&server, Duration::from_secs(5));

    let mut headers = std::collections::HashMap::new();
    headers.insert("x-forwarded-for".to_string(), format!("{}, 10.0.0.1", ADDRESS));
    let session = SessionRequest {
        stream_name: PATH.to_string(),
        query_string: Some(QUERY.to_string()),
        headers,
    };
    assert_eq!(gw.authorize_session(&session), SessionAction::Accept);

    let play = PlayRequest {
        stream_name: format!("aa/123/bb/4567/mp4:movie.mp4?{}", QUERY),
        query_string: None,
        client_address: Some(ADDRESS.to_string()),
    };
    assert_eq!(gw.authorize_play(&play), PlayAction::Play);

    verify.assert_calls(2);
}

#[test]
fn concurrent_decisions_are_independent() {
    let server = MockServer::start();
    let verify = server.mock(|when, then| {
        when.method(HEAD).path(VERIFY_PATH);
        then.status(200);
    });
    let (gw, _) = gateway(&server, Duration::from_secs(5));
    let gw = Arc::new(gw);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let gw = Arc::clone(&gw);
            std::thread::spawn(move || gw.authorize(PATH, Some(QUERY), Some(ADDRESS)))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    verify.assert_calls(4);
}
