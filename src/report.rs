//! Out-of-band notice reporting.
//!
//! Unexpected failures (bad configuration, implausible client addresses,
//! verification transport errors) are handed to a [`NoticeReporter`] in
//! addition to being logged. Reporting is fire-and-forget: it never blocks
//! or changes an authorization decision.

use crate::StreamgateError;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Serialize;
use std::fmt::Display;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default notice intake endpoint.
pub const DEFAULT_NOTICE_ENDPOINT: &str = "https://api.honeybadger.io/v1/notices";

const ENV_API_KEY: &str = "STREAMGATE_NOTICE_API_KEY";
const ENV_ENVIRONMENT: &str = "STREAMGATE_NOTICE_ENV";
const ENV_ENDPOINT: &str = "STREAMGATE_NOTICE_ENDPOINT";

/// A single reportable event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    /// Human-readable description.
    pub message: String,
    /// Underlying error text, if any.
    pub cause: Option<String>,
    /// When the notice was raised.
    pub occurred_at: DateTime<Utc>,
}

impl Notice {
    /// Create a notice stamped with the current time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
            occurred_at: Utc::now(),
        }
    }

    /// Attach the underlying error.
    pub fn with_cause(mut self, cause: impl Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// Sink for notices about unexpected failures.
pub trait NoticeReporter: Send + Sync {
    /// Report a notice. Must not block on network I/O.
    fn report(&self, notice: Notice);
}

/// Reporter that only emits a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl NoticeReporter for TracingReporter {
    fn report(&self, notice: Notice) {
        warn!(
            target: "streamgate::notice",
            notice = %notice.message,
            cause = notice.cause.as_deref().unwrap_or(""),
            occurred_at = %notice.occurred_at.to_rfc3339(),
            "notice raised"
        );
    }
}

/// Reporter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl NoticeReporter for NoopReporter {
    fn report(&self, _notice: Notice) {}
}

/// Settings for [`HttpNoticeReporter`].
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// API key sent in the `X-API-Key` header.
    pub api_key: String,
    /// Deployment environment name (e.g. "production").
    pub environment: String,
    /// Intake endpoint.
    pub endpoint: String,
}

impl ReporterConfig {
    /// Read reporter settings from `STREAMGATE_NOTICE_*` environment variables.
    ///
    /// # Errors
    /// `ReporterConfig` if the API key or environment name is missing.
    pub fn from_env() -> Result<Self, StreamgateError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, StreamgateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY).filter(|v| !v.is_empty()).ok_or_else(|| {
            StreamgateError::ReporterConfig(format!("missing {}", ENV_API_KEY))
        })?;
        let environment = lookup(ENV_ENVIRONMENT).filter(|v| !v.is_empty()).ok_or_else(|| {
            StreamgateError::ReporterConfig(format!("missing {}", ENV_ENVIRONMENT))
        })?;
        let endpoint = lookup(ENV_ENDPOINT).unwrap_or_else(|| DEFAULT_NOTICE_ENDPOINT.to_string());

        Ok(Self {
            api_key,
            environment,
            endpoint,
        })
    }
}

#[derive(Serialize)]
struct NoticePayload<'a> {
    error: ErrorSection<'a>,
    server: ServerSection<'a>,
}

#[derive(Serialize)]
struct ErrorSection<'a> {
    class: &'static str,
    message: &'a str,
    cause: Option<&'a str>,
    occurred_at: String,
}

#[derive(Serialize)]
struct ServerSection<'a> {
    environment_name: &'a str,
}

/// Notices waiting for delivery beyond this are dropped.
pub const NOTICE_QUEUE_CAPACITY: usize = 64;

/// Reporter that POSTs notices as JSON to an intake endpoint.
///
/// Notices are queued for a single background delivery thread so the caller
/// never waits on the network. When the queue is full the notice is logged
/// and dropped. Delivery failures are logged and dropped.
pub struct HttpNoticeReporter {
    queue: Mutex<SyncSender<serde_json::Value>>,
    environment: String,
}

impl HttpNoticeReporter {
    /// Create a reporter from config and start its delivery thread.
    pub fn new(config: ReporterConfig) -> Result<Self, StreamgateError> {
        Self::with_capacity(config, NOTICE_QUEUE_CAPACITY)
    }

    pub(crate) fn with_capacity(config: ReporterConfig, capacity: usize) -> Result<Self, StreamgateError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            StreamgateError::ReporterConfig(format!("bad notice endpoint {}: {}", config.endpoint, e))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StreamgateError::ReporterConfig(format!("Failed to create client: {}", e)))?;

        let (sender, receiver) = mpsc::sync_channel(capacity);
        let api_key = config.api_key;
        thread::Builder::new()
            .name("streamgate-notices".to_string())
            .spawn(move || deliver(client, endpoint, api_key, receiver))
            .map_err(|e| StreamgateError::ReporterConfig(format!("Failed to start delivery thread: {}", e)))?;

        Ok(Self {
            queue: Mutex::new(sender),
            environment: config.environment,
        })
    }

    fn payload(&self, notice: &Notice) -> serde_json::Value {
        let payload = NoticePayload {
            error: ErrorSection {
                class: "StreamgateNotice",
                message: &notice.message,
                cause: notice.cause.as_deref(),
                occurred_at: notice.occurred_at.to_rfc3339(),
            },
            server: ServerSection {
                environment_name: &self.environment,
            },
        };
        serde_json::to_value(&payload).unwrap_or(serde_json::Value::Null)
    }
}

impl NoticeReporter for HttpNoticeReporter {
    fn report(&self, notice: Notice) {
        let body = self.payload(&notice);
        let sent = match self.queue.lock() {
            Ok(queue) => queue.try_send(body),
            Err(_) => {
                warn!(notice = %notice.message, "notice queue unavailable; dropping notice");
                return;
            }
        };
        match sent {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(notice = %notice.message, "notice queue full; dropping notice");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(notice = %notice.message, "notice delivery stopped; dropping notice");
            }
        }
    }
}

/// Delivery loop; ends when the reporter is dropped.
fn deliver(client: Client, endpoint: Url, api_key: String, receiver: Receiver<serde_json::Value>) {
    for body in receiver {
        let result = client
            .post(endpoint.clone())
            .header("X-API-Key", api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send();
        match result {
            Ok(response) if response.status().is_success() => {
                debug!(endpoint = %endpoint, "notice delivered");
            }
            Ok(response) => {
                warn!(endpoint = %endpoint, status = response.status().as_u16(), "notice rejected");
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "notice delivery failed");
            }
        }
    }
}

/// Build the process reporter from the environment.
///
/// Falls back to [`TracingReporter`] when reporter settings are incomplete;
/// a missing reporter never disables authorization.
pub fn reporter_from_env() -> Arc<dyn NoticeReporter> {
    match ReporterConfig::from_env().and_then(HttpNoticeReporter::new) {
        Ok(reporter) => Arc::new(reporter),
        Err(e) => {
            warn!(error = %e, "notice reporting limited to logs");
            Arc::new(TracingReporter)
        }
    }
}

/// Reporter that keeps notices in memory for inspection.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug, Default)]
pub struct RecordingReporter {
    notices: Mutex<Vec<Notice>>,
}

#[cfg(any(test, feature = "test-seams"))]
impl RecordingReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the notices reported so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl NoticeReporter for RecordingReporter {
    fn report(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
