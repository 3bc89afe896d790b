//! Administrative handlers. Every route requires [`Authenticated`].
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/admin/submissions` | `?status=pending\|approved\|any&text=&tier=&category=` |
//! | `POST`   | `/admin/submissions/{id}/approve` | |
//! | `DELETE` | `/admin/submissions/{id}` | Deletes record and file |
//! | `GET`    | `/admin/stats` | |
//! | `GET`    | `/admin/rounds` | Newest first |
//! | `POST`   | `/admin/rounds` | Body: `{"title":"…"}` (optional) |
//! | `POST`   | `/admin/rounds/{id}/close` | Keeps ballots |
//! | `DELETE` | `/admin/rounds/{id}` | Deletes round and ballots |
//! | `GET`    | `/admin/consistency` | |
//! | `POST`   | `/admin/consistency/repair` | |
//! | `GET`    | `/admin/settings` | |
//! | `PATCH`  | `/admin/settings` | Body: any subset of the settings switches |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use davinci_core::{
  object_store::ObjectStore,
  round::{ConsistencyReport, TeardownReport, VotingRound},
  store::CommunityStore,
  submission::{Category, ReviewStatus, SkillTier, Submission, SubmissionFilter},
};
use davinci_service::{Settings, SettingsPatch, SubmissionStats};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── Moderation ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub status:   ReviewStatus,
  pub text:     Option<String>,
  pub tier:     Option<SkillTier>,
  pub category: Option<Category>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

/// `GET /admin/submissions`
pub async fn list_submissions<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Submission>>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  let filter = SubmissionFilter {
    status:          params.status,
    text:            params.text,
    search_contacts: true,
    tier:            params.tier,
    category:        params.category,
    limit:           params.limit,
    offset:          params.offset,
  };
  Ok(Json(state.community.list_submissions(&admin, filter).await?))
}

/// `POST /admin/submissions/{id}/approve`
pub async fn approve<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<Submission>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.approve(&admin, id).await?))
}

/// `DELETE /admin/submissions/{id}`
pub async fn reject<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<Submission>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.reject(&admin, id).await?))
}

/// `GET /admin/stats`
pub async fn stats<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
) -> Result<Json<SubmissionStats>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.stats(&admin).await?))
}

// ─── Rounds ──────────────────────────────────────────────────────────────────

/// `GET /admin/rounds`
pub async fn list_rounds<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
) -> Result<Json<Vec<VotingRound>>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.list_rounds(&admin).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateRoundBody {
  #[serde(default)]
  pub title: String,
}

/// `POST /admin/rounds`
pub async fn create_round<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
  Json(body): Json<CreateRoundBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  let round = state.community.create_round(&admin, &body.title).await?;
  Ok((StatusCode::CREATED, Json(round)))
}

/// `POST /admin/rounds/{id}/close`
pub async fn close_round<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<VotingRound>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.close_round(&admin, id).await?))
}

/// `DELETE /admin/rounds/{id}`
pub async fn teardown_round<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<TeardownReport>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.teardown_round(&admin, id).await?))
}

/// `GET /admin/consistency`
pub async fn consistency<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
) -> Result<Json<ConsistencyReport>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.check_consistency(&admin).await?))
}

/// `POST /admin/consistency/repair`
pub async fn repair<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
) -> Result<Json<ConsistencyReport>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.repair_consistency(&admin).await?))
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// `GET /admin/settings`
pub async fn settings<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(_admin): Authenticated,
) -> Json<Settings>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Json(state.community.settings())
}

/// `PATCH /admin/settings`
pub async fn update_settings<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(admin): Authenticated,
  Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.update_settings(&admin, patch)?))
}
