pub mod config;

pub use config::{MediaConfig, SigningSecret, DEFAULT_CONFIG_FILE, SECRET_ENV};
