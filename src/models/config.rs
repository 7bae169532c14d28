use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::services::url_signer::{MAX_EXPIRY_SECS, MIN_EXPIRY_SECS};
use crate::services::LinkSigner;

/// Environment variable holding the shared secret, same name as the
/// `wp-config.php` constant the proxy configuration is usually written against.
pub const SECRET_ENV: &str = "HTTP_SECURE_LINK_SECRET";

/// Config file read when `CONFIG_FILE` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "secure-media.yaml";

/// Shared secret wrapper that keeps the value out of logs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret. Never log this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningSecret").field(&"<redacted>").finish()
    }
}

impl fmt::Display for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Secure media configuration loaded from secure-media.yaml and the environment
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Shared secret; signing is disabled while this is unset
    #[serde(default)]
    pub secret: Option<SigningSecret>,

    /// Minimum time in seconds a link stays valid. Should exceed any output
    /// cache lifetime. At most one year.
    #[serde(default = "default_expiry")]
    pub expiry: u64,

    /// Absolute URL of the protected media root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// External URL prefix of the site, e.g. `https://example.com`
    #[serde(default)]
    pub site_prefix: String,

    /// Explicit uploads path, overrides the one derived from `base_url`
    #[serde(default)]
    pub uploads_base_path: Option<String>,
}

fn default_expiry() -> u64 {
    MIN_EXPIRY_SECS
}

fn default_base_url() -> String {
    "/wp-content/uploads".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            secret: None,
            expiry: default_expiry(),
            base_url: default_base_url(),
            site_prefix: String::new(),
            uploads_base_path: None,
        }
    }
}

impl MediaConfig {
    /// Load from `CONFIG_FILE` (or [`DEFAULT_CONFIG_FILE`] when present), then
    /// apply environment overrides. An unreadable file falls back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_FILE").ok().map(PathBuf::from);
        let mut config = match path {
            Some(path) => Self::from_file_or_default(&path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file_or_default(fallback)
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;

        tracing::info!(
            uploads_path = %config.uploads_path(),
            expiry = config.effective_expiry(),
            secret_configured = config.has_secret(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn from_file_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(%e, path = %path.display(), "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate("expiry")?;
        Ok(config)
    }

    /// Reject an expiry above [`MAX_EXPIRY_SECS`]; `key` names the source in
    /// the error.
    fn validate(&self, key: &'static str) -> Result<(), ConfigError> {
        if self.expiry > MAX_EXPIRY_SECS {
            return Err(ConfigError::InvalidValue {
                key,
                value: self.expiry.to_string(),
            });
        }
        Ok(())
    }

    /// Apply `HTTP_SECURE_LINK_SECRET` and `SECURE_MEDIA_*` overrides.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(SECRET_ENV) {
            self.secret = Some(SigningSecret::new(secret));
        }
        if let Some(expiry) = lookup("SECURE_MEDIA_EXPIRY") {
            self.expiry = expiry
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SECURE_MEDIA_EXPIRY",
                    value: expiry.clone(),
                })?;
            self.validate("SECURE_MEDIA_EXPIRY")?;
        }
        if let Some(base_url) = lookup("SECURE_MEDIA_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(site_prefix) = lookup("SECURE_MEDIA_SITE_PREFIX") {
            self.site_prefix = site_prefix;
        }
        if let Some(path) = lookup("SECURE_MEDIA_UPLOADS_PATH") {
            self.uploads_base_path = Some(path);
        }
        Ok(())
    }

    pub fn has_secret(&self) -> bool {
        self.secret.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn effective_expiry(&self) -> u64 {
        self.expiry.clamp(MIN_EXPIRY_SECS, MAX_EXPIRY_SECS)
    }

    /// Fail on an out-of-range expiry set directly on the struct.
    pub fn check_expiry(&self) -> Result<(), ConfigError> {
        self.validate("expiry")
    }

    /// Site prefix without a trailing slash.
    pub fn site_url(&self) -> &str {
        self.site_prefix.trim_end_matches('/')
    }

    /// Path prefix identifying protected media: the explicit
    /// `uploads_base_path`, or `base_url` with the site prefix removed.
    pub fn uploads_path(&self) -> String {
        if let Some(path) = &self.uploads_base_path {
            return path.clone();
        }
        let site_url = self.site_url();
        if site_url.is_empty() {
            self.base_url.clone()
        } else {
            self.base_url.replace(site_url, "")
        }
    }

    /// Build the link signer, or report why signing cannot run.
    pub fn signer(&self) -> Result<LinkSigner, ConfigError> {
        LinkSigner::new(self)
    }
}
