//! Bearer-token extractor producing an authenticated actor.
//!
//! The verified actor is an explicit value threaded into handlers — no
//! ambient request-scoped session state. A handler that takes
//! [`AuthIdentity`] cannot run without a live, token-verified identity.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use gather_core::{identity::Identity, store::Store};

use crate::{AppState, error::ApiError, token::{Claims, TokenKeys}};

/// The authenticated caller: present in a handler signature means the
/// request carried a valid bearer token resolving to a live identity.
#[derive(Debug)]
pub struct AuthIdentity(pub Identity);

/// Parse and verify the `Authorization: Bearer <token>` header.
pub fn claims_from_headers(
  headers: &HeaderMap,
  keys: &TokenKeys,
) -> Result<Claims, ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::TokenMissing)?;

  let token = header_val
    .strip_prefix("Bearer ")
    .ok_or(ApiError::TokenMissing)?;

  keys.verify(token)
}

impl<S> FromRequestParts<AppState<S>> for AuthIdentity
where
  S: Store + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let claims = claims_from_headers(&parts.headers, &state.tokens)?;

    // The token may outlive its identity; a stale token is 404, not 401.
    let identity = state
      .store
      .get_identity(claims.sub)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| {
        ApiError::NotFound(format!("identity {} not found", claims.sub))
      })?;

    Ok(AuthIdentity(identity))
  }
}
