pub mod entities;
pub mod link_rewriter;
pub mod url_parts;
pub mod url_signer;

pub use link_rewriter::LinkSigner;
pub use url_signer::{SignedToken, UrlSigner};
