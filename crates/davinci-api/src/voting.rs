//! Voting handlers: the active round, ballots and results.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/rounds/active` | `null` when no round is running |
//! | `GET`  | `/rounds/{id}/results` | Ranked per tier |
//! | `GET`  | `/rounds/{id}/voters/status` | `?contact=` |
//! | `POST` | `/rounds/{id}/ballots` | One vote |
//! | `POST` | `/rounds/{id}/ballot-sheet` | One vote per tier |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use davinci_core::{
  ballot::VoterStatus,
  object_store::ObjectStore,
  round::ActiveRoundView,
  store::CommunityStore,
  submission::SkillTier,
};
use davinci_service::{BallotOutcome, Pick, RoundResults};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /rounds/active`
pub async fn active_round<S, O>(
  State(state): State<AppState<S, O>>,
) -> Result<Json<Option<ActiveRoundView>>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.active_round().await?))
}

/// `GET /rounds/{id}/results`
pub async fn results<S, O>(
  State(state): State<AppState<S, O>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RoundResults>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.tally(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
  pub contact: String,
}

/// `GET /rounds/{id}/voters/status?contact=`
pub async fn voter_status<S, O>(
  State(state): State<AppState<S, O>>,
  Path(id): Path<Uuid>,
  Query(params): Query<StatusParams>,
) -> Result<Json<VoterStatus>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.community.voter_status(id, &params.contact).await?))
}

// ─── Ballots ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BallotBody {
  pub voter_name:    String,
  pub voter_contact: String,
  pub skill_tier:    SkillTier,
  pub submission_id: Uuid,
}

/// `POST /rounds/{id}/ballots`
pub async fn cast_ballot<S, O>(
  State(state): State<AppState<S, O>>,
  Path(id): Path<Uuid>,
  Json(body): Json<BallotBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  let ballot = state
    .community
    .cast_ballot(
      id,
      &body.voter_name,
      &body.voter_contact,
      body.skill_tier,
      body.submission_id,
    )
    .await?;
  Ok((StatusCode::CREATED, Json(ballot)))
}

#[derive(Debug, Deserialize)]
pub struct BallotSheetBody {
  pub voter_name:    String,
  pub voter_contact: String,
  pub picks:         Vec<Pick>,
}

/// `POST /rounds/{id}/ballot-sheet`
pub async fn cast_ballot_sheet<S, O>(
  State(state): State<AppState<S, O>>,
  Path(id): Path<Uuid>,
  Json(body): Json<BallotSheetBody>,
) -> Result<Json<BTreeMap<SkillTier, BallotOutcome>>, ApiError>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  let outcomes = state
    .community
    .cast_ballots(id, &body.voter_name, &body.voter_contact, &body.picks)
    .await?;
  Ok(Json(outcomes))
}
