use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use md5::{Digest, Md5};

use crate::models::SigningSecret;

/// Shortest link lifetime we will hand out, in seconds.
pub const MIN_EXPIRY_SECS: u64 = 30;

/// Longest link lifetime we will hand out, in seconds (one year).
pub const MAX_EXPIRY_SECS: u64 = 365 * 24 * 60 * 60;

/// Token appended to a media URL as `s` and `e` query arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    pub signature: String,
    pub expires: i64,
}

/// URL signing service compatible with Nginx `secure_link_md5`.
///
/// The proxy is expected to be configured as
/// `secure_link_md5 "<secret>$uri$arg_e"` with `secure_link $arg_s,$arg_e`.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    secret: SigningSecret,
    /// Bucket size in seconds, never below [`MIN_EXPIRY_SECS`]
    expiry_secs: u64,
}

impl UrlSigner {
    /// Expiry is clamped into `MIN_EXPIRY_SECS..=MAX_EXPIRY_SECS`.
    pub fn new(secret: SigningSecret, expiry_secs: u64) -> Self {
        Self {
            secret,
            expiry_secs: expiry_secs.clamp(MIN_EXPIRY_SECS, MAX_EXPIRY_SECS),
        }
    }

    pub fn expiry_secs(&self) -> u64 {
        self.expiry_secs
    }

    /// End of the expiry bucket after the one containing `now`.
    ///
    /// Rounding up to a bucket boundary lets every page rendered within the
    /// same bucket share a URL, so browsers can cache the media.
    /// Saturates at `i64::MAX` instead of wrapping for clocks near the end
    /// of the representable range.
    pub fn expires_at(&self, now: i64) -> i64 {
        // Clamped in `new`, always fits
        let expiry = self.expiry_secs as i64;
        now.saturating_add(expiry)
            .saturating_add(expiry - now.rem_euclid(expiry))
    }

    /// `base64url_nopad(md5(secret . path . expires))`
    pub fn signature(&self, path: &str, expires: i64) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.secret.expose().as_bytes());
        hasher.update(path.as_bytes());
        hasher.update(expires.to_string().as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Sign a URL path for an expiry from [`expires_at`](Self::expires_at).
    pub fn token(&self, path: &str, expires: i64) -> SignedToken {
        SignedToken {
            signature: self.signature(path, expires),
            expires,
        }
    }
}
