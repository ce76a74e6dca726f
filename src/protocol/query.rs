//! Request-Target and Query String Decoding
//!
//! The request-target is split at the first `?`. The query string is decoded
//! as `application/x-www-form-urlencoded` by the `url` crate:
//!
//! - `+` decodes to a space
//! - `%XX` (two hex digits) decodes to the byte `0xXX`
//! - a malformed escape (`%4`, `%zz`, trailing `%`) is kept literally
//!
//! The decoded bytes are interpreted as UTF-8, replacing invalid sequences.

use std::collections::HashMap;
use url::form_urlencoded;

/// Splits a request-target into its path and decoded query parameters.
pub fn split_target(target: &str) -> (String, HashMap<String, String>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target.to_string(), HashMap::new()),
    }
}

/// Decodes a query string into a parameter map.
///
/// Empty pairs (`a=1&&b=2`) are skipped, a pair without `=` maps to an empty
/// value, and duplicate keys keep the last value.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decodes a single value through the query parser.
    fn decode(value: &str) -> String {
        parse_query(&format!("v={value}"))
            .remove("v")
            .unwrap_or_default()
    }

    #[test]
    fn test_decode_space_escape() {
        assert_eq!(decode("hello%20world"), "hello world");
    }

    #[test]
    fn test_decode_plus_as_space() {
        assert_eq!(decode("hello+world"), "hello world");
        // An escaped plus stays a plus
        assert_eq!(decode("1%2B1"), "1+1");
    }

    #[test]
    fn test_decode_multibyte_utf8() {
        assert_eq!(decode("caf%C3%A9"), "café");
    }

    #[test]
    fn test_malformed_escapes_pass_through() {
        assert_eq!(decode("100%"), "100%");
        assert_eq!(decode("%4"), "%4");
        assert_eq!(decode("%zz"), "%zz");
        assert_eq!(decode("%4g1"), "%4g1");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        assert_eq!(decode("a%FFb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_parse_query_empty() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("&&").is_empty());
    }

    #[test]
    fn test_split_target_without_query() {
        let (path, params) = split_target("/data/3");
        assert_eq!(path, "/data/3");
        assert!(params.is_empty());
    }

    #[test]
    fn test_split_target_with_query() {
        let (path, params) = split_target("/echo?message=hello%20world&msg=x&flag&&msg=y");
        assert_eq!(path, "/echo");
        assert_eq!(params.get("message").map(String::as_str), Some("hello world"));
        assert_eq!(params.get("msg").map(String::as_str), Some("y"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_split_target_splits_at_first_question_mark() {
        let (path, params) = split_target("/echo?message=why?");
        assert_eq!(path, "/echo");
        assert_eq!(params.get("message").map(String::as_str), Some("why?"));
    }

    #[test]
    fn test_decoded_keys() {
        let (_, params) = split_target("/echo?mes%73age=ok");
        assert_eq!(params.get("message").map(String::as_str), Some("ok"));
    }
}
