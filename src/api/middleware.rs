//! Response-body middleware that signs media links on the way out.
//!
//! Textual responses are buffered, passed through [`LinkSigner`] and sent on.
//! Everything else streams through untouched, and so does a textual body that
//! turns out to be larger than [`MAX_BODY_BYTES`].

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::{self, Next},
    response::Response,
    Router,
};
use futures_util::{stream, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;

use crate::models::MediaConfig;
use crate::services::LinkSigner;

/// Largest body we will buffer for rewriting.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const REWRITABLE_TYPES: &[&str] = &[
    "application/xhtml+xml",
    "application/json",
    "application/xml",
];

/// Attach link signing to `router`.
pub fn with_secure_media<S>(router: Router<S>, signer: Arc<LinkSigner>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(signer, sign_media_links))
}

/// Attach link signing when `config` allows it. Without a secret the router
/// is returned unchanged and an operator warning is logged.
pub fn protect_media<S>(router: Router<S>, config: &MediaConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    match config.signer() {
        Ok(signer) => with_secure_media(router, Arc::new(signer)),
        Err(e) => {
            tracing::warn!(
                %e,
                "Secure media setup is incomplete; media links will be served unsigned"
            );
            router
        }
    }
}

/// Middleware: rewrite media links in textual response bodies.
pub async fn sign_media_links(
    State(signer): State<Arc<LinkSigner>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if !is_rewritable(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match buffer_body(body).await {
        Ok(bytes) => bytes,
        Err(body) => return Response::from_parts(parts, body),
    };

    let rewritten = match signer.rewrite_bytes_now(&bytes) {
        Cow::Borrowed(_) => None,
        Cow::Owned(rewritten) => Some(rewritten),
    };

    match rewritten {
        Some(rewritten) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(rewritten))
        }
        None => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Collect `body` up to [`MAX_BODY_BYTES`].
///
/// A body that grows past the bound, or fails part way, comes back as `Err`
/// holding an equivalent body: the chunks read so far followed by the rest of
/// the original stream (or its error).
async fn buffer_body(body: Body) -> Result<Bytes, Body> {
    let mut chunks = body.into_data_stream();
    let mut buffered = Vec::new();

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(chunk) => {
                buffered.extend_from_slice(&chunk);
                if buffered.len() > MAX_BODY_BYTES {
                    tracing::warn!("Response body too large for link signing, passing through");
                    let head = stream::once(async move { Ok(Bytes::from(buffered)) });
                    return Err(Body::from_stream(head.chain(chunks)));
                }
            }
            Err(e) => {
                tracing::warn!(%e, "Failed to buffer response body for link signing");
                let head = stream::iter([Ok(Bytes::from(buffered)), Err(e)]);
                return Err(Body::from_stream(head));
            }
        }
    }

    Ok(Bytes::from(buffered))
}

/// Only uncompressed text bodies within the size bound are rewritten.
fn is_rewritable(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::CONTENT_ENCODING) {
        return false;
    }

    let too_large = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len > MAX_BODY_BYTES);
    if too_large {
        tracing::warn!("Response body too large for link signing, passing through");
        return false;
    }

    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.starts_with("text/") || REWRITABLE_TYPES.contains(&mime.as_str())
}
