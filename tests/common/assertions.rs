//! Assertion helpers for tests.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use super::app::TestResponse;

/// Assert response has expected status code
pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status, expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );
}

/// Assert response is OK (200)
pub fn assert_ok(response: &TestResponse) {
    assert_status(response, StatusCode::OK);
}

/// Collect every `e=` value in `text`
pub fn expiries(text: &str) -> Vec<String> {
    query_values(text, "e")
}

/// Collect every `s=` value in `text`
pub fn signatures(text: &str) -> Vec<String> {
    query_values(text, "s")
}

fn query_values(text: &str, key: &str) -> Vec<String> {
    let needles = [format!("?{key}="), format!("&{key}=")];
    let mut values = Vec::new();
    for needle in &needles {
        let mut rest = text;
        while let Some(pos) = rest.find(needle.as_str()) {
            let tail = &rest[pos + needle.len()..];
            let end = tail
                .find(|c: char| matches!(c, '&' | '#' | '"' | '\'' | ' ' | '<' | '>'))
                .unwrap_or(tail.len());
            values.push(tail[..end].to_string());
            rest = &tail[end..];
        }
    }
    values
}

/// Assert every link in `text` carries the same expiry and return it
pub fn assert_single_expiry(text: &str) -> String {
    let expiries = expiries(text);
    assert!(!expiries.is_empty(), "Expected signed links in: {text}");
    let first = expiries[0].clone();
    assert!(
        expiries.iter().all(|e| *e == first),
        "Expected one shared expiry, got {expiries:?}"
    );
    first
}
