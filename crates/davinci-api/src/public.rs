//! Public handlers: community profile, submissions and the gallery.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/community` | Profile plus which switches are open |
//! | `POST` | `/submissions` | Body: JSON with the file as base64 |
//! | `GET`  | `/gallery` | Approved entries without contacts; `?tier=&category=&text=&limit=&offset=` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use bytes::Bytes;
use davinci_core::{
  object_store::ObjectStore,
  store::CommunityStore,
  submission::{Category, PublicSubmission, SkillTier, SubmissionFilter},
};
use davinci_service::{CommunityOverview, SubmissionRequest};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── Community ───────────────────────────────────────────────────────────────

/// `GET /community`
pub async fn community<S, O>(State(state): State<AppState<S, O>>) -> Json<CommunityOverview>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Json(state.community.overview())
}

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub artist_name: String,
  pub contact:     String,
  pub skill_tier:  SkillTier,
  pub category:    Category,
  /// Base64 image bytes, optionally as a `data:` URL.
  pub file:        String,
}

/// Decode plain base64 or a `data:<type>;base64,<payload>` URL.
fn decode_file(raw: &str) -> Result<Bytes, ApiError> {
  let payload = match raw.strip_prefix("data:") {
    Some(rest) => {
      rest
        .split_once(";base64,")
        .ok_or_else(|| ApiError::BadRequest("data URL is not base64".into()))?
        .1
    }
    None => raw,
  };
  B64
    .decode(payload.trim())
    .map(Bytes::from)
    .map_err(|e| ApiError::BadRequest(format!("file is not valid base64: {e}")))
}

/// `POST /submissions`
pub async fn submit<S, O>(
  State(state): State<AppState<S, O>>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  let file = decode_file(&body.file)?;
  let submission = state
    .community
    .submit(SubmissionRequest {
      artist_name: body.artist_name,
      contact: body.contact,
      skill_tier: body.skill_tier,
      category: body.category,
      file,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(submission)))
}

// ─── Gallery ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct GalleryParams {
  pub tier:     Option<SkillTier>,
  pub category: Option<Category>,
  pub text:     Option<String>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

/// `GET /gallery`
pub async fn gallery<S, O>(
  State(state): State<AppState<S, O>>,
  Query(params): Query<GalleryParams>,
) -> Result<Json<Vec<PublicSubmission>>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  let submissions = state
    .community
    .gallery(SubmissionFilter {
      text: params.text,
      tier: params.tier,
      category: params.category,
      limit: params.limit,
      offset: params.offset,
      ..Default::default()
    })
    .await?;
  Ok(Json(submissions))
}
