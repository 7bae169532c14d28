//! Rewrites media links in a rendered document to carry a secure link token.
//!
//! Every URL under the uploads path gets `s=<signature>&e=<expires>` appended.
//! All links rewritten in one pass share the same `e`, so a cached page stays
//! internally consistent.

use regex::{bytes, Captures, Regex};
use std::borrow::Cow;

use crate::error::{ConfigError, SignError};
use crate::models::MediaConfig;
use crate::services::entities;
use crate::services::url_parts::{add_query_args, extract_path};
use crate::services::url_signer::UrlSigner;

/// Characters that end a link: PCRE `\s` plus both quote characters.
const LINK_BODY: &str = r#"[^ \t\n\x0B\x0C\r'"]*"#;

/// [`LINK_BODY`] over raw bytes, so links in non-UTF-8 documents still match.
const LINK_BODY_BYTES: &str = r#"(?-u:[^ \t\n\x0B\x0C\r'"])*"#;

/// Quote-or-space delimiter around a link.
const DELIMITER: &str = r#"['" ]"#;

/// Signs media links found in text. Immutable once built and safe to share
/// between concurrent requests.
#[derive(Debug)]
pub struct LinkSigner {
    signer: UrlSigner,
    uploads_path: String,
    pattern: Regex,
    byte_pattern: bytes::Regex,
}

impl LinkSigner {
    /// Build a signer from configuration. Fails when no secret is configured;
    /// links must never be rewritten with an empty key.
    pub fn new(config: &MediaConfig) -> Result<Self, ConfigError> {
        config.check_expiry()?;

        let secret = config
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let uploads_path = config.uploads_path();
        if uploads_path.is_empty() {
            return Err(ConfigError::EmptyUploadsPath);
        }

        let site_url = config.site_url();
        let site_group = if site_url.is_empty() {
            String::new()
        } else {
            format!("(?:{})?", regex::escape(site_url))
        };
        let prefix = format!("{site_group}{}", regex::escape(&uploads_path));
        let pattern = Regex::new(&format!(
            "({DELIMITER}?)({prefix}{LINK_BODY})({DELIMITER})"
        ))?;
        let byte_pattern = bytes::Regex::new(&format!(
            "({DELIMITER}?)({prefix}{LINK_BODY_BYTES})({DELIMITER})"
        ))?;

        tracing::debug!(uploads_path = %uploads_path, "Link signer ready");

        Ok(Self {
            signer: UrlSigner::new(secret, config.expiry),
            uploads_path,
            pattern,
            byte_pattern,
        })
    }

    pub fn uploads_path(&self) -> &str {
        &self.uploads_path
    }

    pub fn url_signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Rewrite every media link in `content`, using `now` (Unix seconds) to
    /// pick the expiry bucket. Links that cannot be signed are left as-is.
    pub fn rewrite_links<'a>(&self, content: &'a str, now: i64) -> Cow<'a, str> {
        if !content.contains(self.uploads_path.as_str()) {
            return Cow::Borrowed(content);
        }

        let expires = self.signer.expires_at(now);
        let mut signed = 0usize;
        let mut skipped = 0usize;

        let rewritten = self.pattern.replace_all(content, |caps: &Captures| {
            let url = &caps[2];
            match self.sign_with_expiry(url, expires) {
                Ok(signed_url) => {
                    signed += 1;
                    format!("{}{}{}", &caps[1], signed_url, &caps[3])
                }
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(%e, "Leaving media link unsigned");
                    caps[0].to_string()
                }
            }
        });

        tracing::debug!(signed, skipped, expires, "Rewrote media links");
        rewritten
    }

    /// [`rewrite_links`](Self::rewrite_links) with the current wall clock.
    pub fn rewrite_links_now<'a>(&self, content: &'a str) -> Cow<'a, str> {
        self.rewrite_links(content, chrono::Utc::now().timestamp())
    }

    /// [`rewrite_links`](Self::rewrite_links) for documents in any
    /// ASCII-compatible encoding. Links that are not valid UTF-8 are left
    /// unsigned; the rest of the document is copied byte for byte.
    pub fn rewrite_bytes<'a>(&self, content: &'a [u8], now: i64) -> Cow<'a, [u8]> {
        let needle = self.uploads_path.as_bytes();
        if !content.windows(needle.len()).any(|window| window == needle) {
            return Cow::Borrowed(content);
        }

        let expires = self.signer.expires_at(now);
        let mut signed = 0usize;
        let mut skipped = 0usize;

        let rewritten = self.byte_pattern.replace_all(content, |caps: &bytes::Captures| {
            let url = match std::str::from_utf8(&caps[2]) {
                Ok(url) => self.sign_with_expiry(url, expires),
                Err(_) => Err(SignError::MalformedUrl(
                    String::from_utf8_lossy(&caps[2]).into_owned(),
                )),
            };
            match url {
                Ok(signed_url) => {
                    signed += 1;
                    [&caps[1], signed_url.as_bytes(), &caps[3]].concat()
                }
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(%e, "Leaving media link unsigned");
                    caps[0].to_vec()
                }
            }
        });

        tracing::debug!(signed, skipped, expires, "Rewrote media links");
        rewritten
    }

    /// [`rewrite_bytes`](Self::rewrite_bytes) with the current wall clock.
    pub fn rewrite_bytes_now<'a>(&self, content: &'a [u8]) -> Cow<'a, [u8]> {
        self.rewrite_bytes(content, chrono::Utc::now().timestamp())
    }

    /// Sign a single URL or path for the bucket containing `now`.
    pub fn sign_url(&self, url: &str, now: i64) -> Result<String, SignError> {
        self.sign_with_expiry(url, self.signer.expires_at(now))
    }

    fn sign_with_expiry(&self, url: &str, expires: i64) -> Result<String, SignError> {
        let (decoded, depth) = entities::peel(url);
        let token = self.signer.token(extract_path(&decoded)?, expires);
        let expires = token.expires.to_string();
        let signed = add_query_args(&decoded, &[("s", &token.signature), ("e", &expires)]);
        Ok(entities::wrap(signed, depth))
    }
}
