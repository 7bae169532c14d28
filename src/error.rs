use thiserror::Error;

/// Configuration problems detected while building a [`LinkSigner`].
///
/// [`LinkSigner`]: crate::services::LinkSigner
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HTTP_SECURE_LINK_SECRET is not defined")]
    MissingSecret,

    #[error("Uploads path is empty")]
    EmptyUploadsPath,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid link pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to sign a single matched URL. Never escapes a rewrite pass.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignError {
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    #[error("URL has no path: {0}")]
    EmptyPath(String),
}
