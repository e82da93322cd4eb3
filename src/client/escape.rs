//! Percent-escaping for verification URLs.
//!
//! Two disciplines are needed and must not be mixed up:
//! - path segments: a space becomes `%20`
//! - form parameters: a space becomes `+`
//!
//! Both leave only ASCII alphanumerics and `-._~` untouched (RFC 3986
//! unreserved), so reserved characters such as `/`, `+`, `*` and `'` are
//! always encoded. Non-ASCII text is encoded as UTF-8 bytes.

/// Escape a single URL path segment.
pub fn escape_path_segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Escape a form (query) parameter value.
pub fn escape_form_param(raw: &str) -> String {
    raw.split(' ')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL: &str = "{([special-chars])}: ü@?;=&#$%20^*.|-_+!,~'/\"`";

    #[test]
    fn test_escape_path_segment_special_chars() {
        assert_eq!(
            escape_path_segment(SPECIAL),
            "%7B%28%5Bspecial-chars%5D%29%7D%3A%20%C3%BC%40%3F%3B%3D%26%23%24%2520%5E%2A.%7C-_%2B%21%2C~%27%2F%22%60"
        );
    }

    #[test]
    fn test_escape_form_param_special_chars() {
        assert_eq!(
            escape_form_param(SPECIAL),
            "%7B%28%5Bspecial-chars%5D%29%7D%3A+%C3%BC%40%3F%3B%3D%26%23%24%2520%5E%2A.%7C-_%2B%21%2C~%27%2F%22%60"
        );
    }

    #[test]
    fn test_unreserved_untouched() {
        assert_eq!(escape_path_segment("aa123bb4567"), "aa123bb4567");
        assert_eq!(escape_path_segment("movie-1_final.v2~.mp4"), "movie-1_final.v2~.mp4");
        assert_eq!(escape_form_param("203.0.113.5"), "203.0.113.5");
    }

    #[test]
    fn test_spaces() {
        assert_eq!(escape_path_segment("my movie.mp4"), "my%20movie.mp4");
        assert_eq!(escape_form_param("a b  c"), "a+b++c");
        assert_eq!(escape_form_param(" "), "+");
        assert_eq!(escape_form_param(""), "");
    }
}
