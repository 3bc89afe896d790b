//! Bearer-secret extractor for administrative routes.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use davinci_core::{object_store::ObjectStore, store::CommunityStore};
use davinci_service::{Admin, AdminGate, Error};

use crate::{AppState, error::ApiError};

/// Present in a handler means the request carried the administrative secret.
pub struct Authenticated(pub Admin);

/// Verify the `Authorization: Bearer <secret>` header against `gate`.
pub fn verify_bearer(headers: &HeaderMap, gate: &AdminGate) -> Result<Admin, Error> {
  let secret = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or(Error::Unauthorized)?;
  gate.verify(secret)
}

impl<S, O> FromRequestParts<AppState<S, O>> for Authenticated
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, O>,
  ) -> Result<Self, Self::Rejection> {
    let admin = verify_bearer(&parts.headers, &state.gate).inspect_err(|_| {
      tracing::debug!(path = %parts.uri.path(), "rejected administrative request");
    })?;
    Ok(Authenticated(admin))
  }
}
