//! HTML entity decoding and encoding for URLs embedded in markup.
//!
//! A URL can reach the page already escaped once or several times (for example
//! inside an escaped `srcset` attribute). [`peel`] decodes it to a fixed point
//! and reports how many layers it removed, [`wrap`] puts the same number of
//! layers back after rewriting.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Upper bound on decode passes. Input still changing after this many passes
/// is treated as fully decoded.
pub const MAX_DECODE_DEPTH: usize = 16;

/// Longest reference body we bother scanning for
/// (`CounterClockwiseContourIntegral`).
const MAX_REFERENCE_LEN: usize = 32;

/// Decode one layer of HTML entities.
///
/// Decoded text is never re-scanned within the same pass, so `&amp;amp;`
/// becomes `&amp;`. Only `;`-terminated references are decoded, so a query
/// such as `?a=1&copy=2` is left alone. Unknown or malformed references are
/// kept verbatim.
pub fn decode_once(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];

        match decode_reference(tail) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Decode the reference at the start of `tail` (the text after `&`).
/// Returns the replacement text and the number of bytes consumed, including
/// `;`.
fn decode_reference(tail: &str) -> Option<(String, usize)> {
    let semi = tail
        .char_indices()
        .take(MAX_REFERENCE_LEN + 1)
        .find(|&(_, c)| c == ';')
        .map(|(i, _)| i)?;
    let body = &tail[..semi];

    let decoded = match body.strip_prefix('#') {
        Some(num) => decode_numeric(num)?.to_string(),
        None => decode_named(body)?,
    };

    Some((decoded, semi + 1))
}

fn decode_numeric(num: &str) -> Option<char> {
    let (digits, radix) = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
        Some(hex) => (hex, 16),
        None => (num, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let code = u32::from_str_radix(digits, radix).ok()?;
    char::from_u32(code).filter(|&c| c != '\0')
}

/// Look `name` up in the HTML5 named character reference table.
fn decode_named(name: &str) -> Option<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let reference = format!("&{name};");
    let decoded = htmlize::unescape(reference.as_str());
    // A legacy prefix match (`&ampx;` -> `&x;`) leaves the `;` behind
    if decoded == reference.as_str() || decoded.contains(';') {
        return None;
    }
    Some(decoded.into_owned())
}

/// Preferred entity name for each non-ASCII character that has one.
///
/// Several names can map to one character (`&copy;`, `&COPY;`); the shortest
/// wins, lowercase first, which picks the HTML 4 name where there is one.
fn named_references() -> &'static HashMap<char, &'static str> {
    static TABLE: OnceLock<HashMap<char, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: HashMap<char, &'static str> = HashMap::new();
        for (key, value) in htmlize::ENTITIES.entries() {
            let (Ok(key), Ok(value)) = (std::str::from_utf8(*key), std::str::from_utf8(*value))
            else {
                continue;
            };
            let Some(name) = key.trim_start_matches('&').strip_suffix(';') else {
                continue;
            };
            let mut chars = value.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                continue;
            };
            if c.is_ascii() {
                continue;
            }
            let rank = |n: &str| (n.len(), n.starts_with(char::is_uppercase), n.to_string());
            table
                .entry(c)
                .and_modify(|best| {
                    if rank(name) < rank(*best) {
                        *best = name;
                    }
                })
                .or_insert(name);
        }
        table
    })
}

/// Encode one layer of HTML entities. `&` is always encoded, even when it
/// already starts a reference. Non-ASCII characters with a named reference
/// are encoded by name, so `caf&eacute;` survives a decode/encode cycle.
pub fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c if c.is_ascii() => out.push(c),
            c => match named_references().get(&c) {
                Some(name) => {
                    out.push('&');
                    out.push_str(name);
                    out.push(';');
                }
                None => out.push(c),
            },
        }
    }
    out
}

/// Decode until the text stops changing. Returns the decoded text and the
/// number of passes that changed it.
pub fn peel(input: &str) -> (String, usize) {
    let mut current = input.to_string();
    let mut depth = 0;

    while depth < MAX_DECODE_DEPTH {
        match decode_once(&current) {
            Cow::Owned(decoded) if decoded != current => {
                current = decoded;
                depth += 1;
            }
            _ => break,
        }
    }

    (current, depth)
}

/// Re-apply `depth` layers of encoding.
pub fn wrap(input: String, depth: usize) -> String {
    (0..depth).fold(input, |acc, _| encode(&acc))
}
