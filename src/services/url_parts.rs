//! Minimal URL surgery: path extraction and query-argument append.
//!
//! The path must be taken from the raw URL text without normalization, since
//! the proxy hashes the request path it sees byte for byte.

use crate::error::SignError;

/// Return the path component of `url`.
///
/// Handles absolute (`https://host/p`), protocol-relative (`//host/p`) and
/// path-only forms. Query string and fragment are dropped.
pub fn extract_path(url: &str) -> Result<&str, SignError> {
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    let without_query = without_fragment
        .split_once('?')
        .map_or(without_fragment, |(head, _)| head);

    let path = if let Some(after_scheme) = strip_scheme(without_query) {
        let rest = after_scheme
            .strip_prefix("//")
            .ok_or_else(|| SignError::MalformedUrl(url.to_string()))?;
        strip_authority(rest, url)?
    } else if let Some(rest) = without_query.strip_prefix("//") {
        strip_authority(rest, url)?
    } else {
        without_query
    };

    if path.is_empty() {
        return Err(SignError::EmptyPath(url.to_string()));
    }
    Ok(path)
}

/// Strip a leading `scheme:` (RFC 3986 scheme characters) if present.
fn strip_scheme(url: &str) -> Option<&str> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| &url[colon + 1..])
}

fn strip_authority<'a>(rest: &'a str, url: &str) -> Result<&'a str, SignError> {
    let slash = rest.find('/').unwrap_or(rest.len());
    if slash == 0 {
        return Err(SignError::MalformedUrl(url.to_string()));
    }
    Ok(&rest[slash..])
}

/// Add query arguments to `url`, replacing any existing arguments with the
/// same keys. A `#fragment` stays at the end.
pub fn add_query_args(url: &str, args: &[(&str, &str)]) -> String {
    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = match head.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (head, None),
    };

    let mut pairs: Vec<String> = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            !args.iter().any(|(name, _)| *name == key)
        })
        .map(str::to_string)
        .collect();
    pairs.extend(args.iter().map(|(key, value)| format!("{key}={value}")));

    let mut out = String::with_capacity(url.len() + 64);
    out.push_str(base);
    out.push('?');
    out.push_str(&pairs.join("&"));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
