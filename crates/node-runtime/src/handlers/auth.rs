//! Header-based request authentication.
//!
//! Two independent credentials travel in headers: the optional static
//! `X-API-Key` gating the whole API, and the per-request `X-User-Key`
//! passphrase used for key derivation. The passphrase is never logged and
//! never persisted; it exists only long enough to look up (or derive) an
//! encryption context.

use crate::adapters::{
    API_KEY_HEADER, FEDERATED_QUERY_HEADER, REPLICATED_FROM_HEADER, USER_KEY_HEADER,
};
use crate::context::AppContext;
use crate::error::ApiError;
use axum::http::HeaderMap;
use shared_crypto::EncryptionContext;
use std::sync::Arc;

/// Enforce the static API key when one is configured.
///
/// # Errors
///
/// `401` when the header is missing or does not match.
pub fn check_api_key(ctx: &AppContext, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &ctx.settings.api_key else {
        return Ok(());
    };
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("X-API-Key header required"))?;
    if provided == expected {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Invalid API key"))
    }
}

/// Extract the caller passphrase and resolve its encryption context.
///
/// A cache miss runs the key derivation, which takes hundreds of
/// milliseconds, so it goes to the blocking pool instead of stalling the
/// async worker serving this request.
///
/// # Errors
///
/// `401` when the header is missing or shorter than the configured minimum.
pub async fn require_context(
    ctx: &AppContext,
    headers: &HeaderMap,
) -> Result<Arc<EncryptionContext>, ApiError> {
    let passphrase = require_passphrase(ctx, headers)?;
    let cache = Arc::clone(&ctx.key_cache);
    tokio::task::spawn_blocking(move || cache.get_or_derive(&passphrase))
        .await
        .map_err(|e| ApiError::internal(format!("Key derivation task failed: {e}")))
}

/// The raw passphrase, needed when a write is forwarded to peers.
///
/// # Errors
///
/// Same policy as [`require_context`].
pub fn require_passphrase(ctx: &AppContext, headers: &HeaderMap) -> Result<String, ApiError> {
    let passphrase = headers
        .get(USER_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("X-User-Key header required"))?;
    if passphrase.len() < ctx.settings.min_passphrase_len {
        return Err(ApiError::unauthorized(format!(
            "X-User-Key must be at least {} characters long",
            ctx.settings.min_passphrase_len
        )));
    }
    Ok(passphrase.to_string())
}

/// Origin node of a replicated write, when this request came from a peer.
#[must_use]
pub fn replicated_origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REPLICATED_FROM_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Whether this request is itself a federated read from a peer. Such
/// requests are answered from the local store only, keeping federated
/// lookups to a single hop.
#[must_use]
pub fn is_federated_query(headers: &HeaderMap) -> bool {
    headers.contains_key(FEDERATED_QUERY_HEADER)
}
