//! Token and resource extraction from stream request metadata.
//!
//! A stream name has the form `aa/123/bb/4567/filename.ext`: the first four
//! segments form the content identifier tree, the last one names the media
//! file. Hosts may hand over the stream name with a protocol prefix
//! (`mp4:filename.ext`) or with the query string still attached.
//!
//! Everything here is pure: no I/O, no logging.

use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded;

/// Query parameter carrying the access token.
pub const TOKEN_PARAM: &str = "stacks_token";

/// A query string must be longer than `stacks_token=` to carry a token.
const MIN_TOKEN_QUERY_LEN: usize = TOKEN_PARAM.len() + 1;

/// Number of `/`-delimited segments in a well-formed stream name.
pub const RESOURCE_SEGMENTS: usize = 5;

static CONTENT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}[0-9]{3}[a-z]{2}[0-9]{4}$").expect("static pattern"));

/// Content identifier and file name derived from a stream name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
    /// Concatenation of the four identifier segments, e.g. `aa123bb4567`.
    pub content_id: String,
    /// Media file name with any query suffix and protocol prefix removed.
    pub file_name: String,
}

impl ResourceIdentity {
    /// Derive both parts, or `None` if either cannot be derived.
    pub fn from_path(resource_path: &str) -> Option<Self> {
        Some(Self {
            content_id: extract_content_id(resource_path)?,
            file_name: extract_file_name(resource_path)?,
        })
    }
}

/// Extract the access token from a query string.
///
/// Accepts either a bare query string or a full `path?query` string; only the
/// text after the last `?` is parsed. Returns `Some("")` for a present but
/// blank parameter and `None` when the parameter (or the query) is missing.
/// The first matching parameter wins.
pub fn extract_token(query_string: Option<&str>) -> Option<String> {
    let query_string = query_string?;
    if query_string.len() <= MIN_TOKEN_QUERY_LEN {
        return None;
    }

    let query = query_string.rsplit('?').next().unwrap_or(query_string);
    form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Extract the content identifier (`aa123bb4567`) from a stream name.
///
/// Returns `None` unless the name has exactly five segments and the first
/// four concatenate into a well-formed identifier.
pub fn extract_content_id(resource_path: &str) -> Option<String> {
    let segments: Vec<&str> = resource_path.split('/').collect();
    if segments.len() != RESOURCE_SEGMENTS {
        return None;
    }

    let content_id = segments[..4].concat();
    if CONTENT_ID_PATTERN.is_match(&content_id) {
        Some(content_id)
    } else {
        None
    }
}

/// Extract the media file name from a stream name.
///
/// Drops a query suffix, keeps the last path segment, then drops a protocol
/// prefix such as `mp4:`. Returns `None` if nothing is left, or if what is
/// left is a `.` or `..` path segment.
pub fn extract_file_name(resource_path: &str) -> Option<String> {
    let without_query = match resource_path.find('?') {
        Some(idx) if idx > 0 => &resource_path[..idx],
        _ => resource_path,
    };

    let last_segment = without_query.rsplit('/').next().unwrap_or(without_query);

    let file_name = match last_segment.find(':') {
        Some(idx) if idx > 0 => &last_segment[idx + 1..],
        _ => last_segment,
    };

    if file_name.is_empty() || is_dot_segment(file_name) {
        None
    } else {
        Some(file_name.to_string())
    }
}

/// Whether a path segment would be resolved away by URL normalization.
pub(crate) fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

/// Client address from an `X-Forwarded-For` header value.
///
/// The originating client is the first entry of the comma-separated list;
/// proxies append themselves after it. Returns an empty string when the
/// header is missing or blank.
pub fn client_ip_from_forwarded_for(header: Option<&str>) -> String {
    match header {
        Some(value) if !value.trim().is_empty() => value
            .split(',')
            .next()
            .map(|first| first.trim().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}
