//! Secure Media
//!
//! Signs media URLs in rendered pages so an Nginx `secure_link` module can
//! reject unsigned or expired requests at the edge.
//! This library exposes modules for integration testing.

pub mod api;
pub mod error;
pub mod models;
pub mod services;
