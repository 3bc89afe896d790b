//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": <message>, "kind": <snake_case kind>}`,
//! plus whatever structured detail the client needs to react (seconds left
//! on a cooldown, the tier already voted in, …). Infrastructure failures get
//! a generic message; the detail goes to the log.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use davinci_service::Error as ServiceError;
use serde_json::{Map, Value, json};
use thiserror::Error;

const TRY_AGAIN: &str = "something went wrong on our side, please try again";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Service(#[from] ServiceError),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  fn parts(&self) -> (StatusCode, &'static str, Map<String, Value>) {
    let mut extra = Map::new();
    let (status, kind) = match self {
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      ApiError::Service(e) => match e {
        ServiceError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        ServiceError::NotARoundMember { .. } => {
          (StatusCode::UNPROCESSABLE_ENTITY, "not_a_round_member")
        }
        ServiceError::TierMismatch { claimed, actual } => {
          extra.insert("claimed".into(), json!(claimed));
          extra.insert("actual".into(), json!(actual));
          (StatusCode::UNPROCESSABLE_ENTITY, "tier_mismatch")
        }
        ServiceError::SubmissionsClosed => (StatusCode::FORBIDDEN, "submissions_closed"),
        ServiceError::CategoryClosed(category) => {
          extra.insert("category".into(), json!(category));
          (StatusCode::FORBIDDEN, "category_closed")
        }
        ServiceError::VotingClosed => (StatusCode::FORBIDDEN, "voting_closed"),
        ServiceError::RoundNotActive(_) => (StatusCode::FORBIDDEN, "round_not_active"),
        ServiceError::CooldownActive { remaining } => {
          extra.insert("remaining_seconds".into(), json!(remaining.num_seconds()));
          (StatusCode::TOO_MANY_REQUESTS, "cooldown_active")
        }
        ServiceError::AlreadyVoted(tier) => {
          extra.insert("tier".into(), json!(tier));
          (StatusCode::CONFLICT, "already_voted")
        }
        ServiceError::InsufficientCandidates { found } => {
          extra.insert("found".into(), json!(found));
          (StatusCode::CONFLICT, "insufficient_candidates")
        }
        ServiceError::RoundNotFound(_) => (StatusCode::NOT_FOUND, "round_not_found"),
        ServiceError::SubmissionNotFound(_) => (StatusCode::NOT_FOUND, "submission_not_found"),
        ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        ServiceError::UploadFailed(_) => (StatusCode::BAD_GATEWAY, "upload_failed"),
        ServiceError::PersistFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persist_failed"),
        ServiceError::InconsistentRoundState { .. } => {
          (StatusCode::INTERNAL_SERVER_ERROR, "inconsistent_round_state")
        }
        ServiceError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store"),
      },
    };
    (status, kind, extra)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind, mut body) = self.parts();

    let message = if status.is_server_error() {
      tracing::error!(error = ?self, "request failed");
      TRY_AGAIN.to_owned()
    } else {
      self.to_string()
    };
    body.insert("error".into(), Value::String(message));
    body.insert("kind".into(), Value::String(kind.into()));

    let mut res = (status, Json(Value::Object(body))).into_response();
    match &self {
      ApiError::Service(ServiceError::Unauthorized) => {
        res
          .headers_mut()
          .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
      }
      ApiError::Service(ServiceError::CooldownActive { remaining }) => {
        if let Ok(v) = HeaderValue::from_str(&remaining.num_seconds().max(1).to_string()) {
          res.headers_mut().insert(header::RETRY_AFTER, v);
        }
      }
      _ => {}
    }
    res
  }
}
