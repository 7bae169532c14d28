//! Test fixtures and constants.

use secure_media::models::{MediaConfig, SigningSecret};
use secure_media::services::LinkSigner;

/// Shared secret used across tests
pub const SECRET: &str = "s3cret";

/// Fixed clock: with a 60 second expiry every link signs with `e=180`
pub const NOW: i64 = 100;

/// Expiry produced by [`NOW`] and a 60 second bucket: 100 + 60 + (60 - 40)
pub const EXPIRES: i64 = 180;

/// Site configuration mirroring a WordPress install at example.com
pub fn config() -> MediaConfig {
    MediaConfig {
        secret: Some(SigningSecret::new(SECRET)),
        expiry: 60,
        base_url: "https://example.com/wp-content/uploads".to_string(),
        site_prefix: "https://example.com/".to_string(),
        uploads_base_path: None,
    }
}

pub fn signer() -> LinkSigner {
    LinkSigner::new(&config()).expect("Failed to build link signer")
}

/// A rendered post with media in the common places WordPress puts it
pub const POST_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><link rel="stylesheet" href="/wp-content/themes/site/style.css"></head>
<body>
<article>
  <img src="https://example.com/wp-content/uploads/2024/01/hero.jpg" alt="Hero">
  <img src='/wp-content/uploads/2024/01/thumb.png?v=2' srcset="/wp-content/uploads/2024/01/thumb.png 1x, /wp-content/uploads/2024/01/thumb@2x.png 2x">
  <a href="/wp-content/uploads/2024/01/report.pdf#page=3">Report</a>
</article>
</body>
</html>
"#;

/// A page with no protected media at all
pub const PLAIN_HTML: &str = r#"<html><body><p>Hello, world.</p><img src="/static/logo.svg"></body></html>"#;

/// Size of each chunk of the streamed [`large_chunk`] body
pub const LARGE_CHUNK_BYTES: usize = 1024 * 1024;

/// Chunk count of the streamed body, one MiB past the buffering bound
pub const LARGE_CHUNKS: usize = 17;

/// Chunk `index` of a streamed text body too large to buffer. The first chunk
/// starts with a media link.
pub fn large_chunk(index: usize) -> Vec<u8> {
    let mut chunk = vec![b'x'; LARGE_CHUNK_BYTES];
    if index == 0 {
        let link = b"'/wp-content/uploads/a.png' ";
        chunk[..link.len()].copy_from_slice(link);
    }
    chunk
}
