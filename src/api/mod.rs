pub mod middleware;

pub use middleware::{protect_media, sign_media_links, with_secure_media, MAX_BODY_BYTES};
