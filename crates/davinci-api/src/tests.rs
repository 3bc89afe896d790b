//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use davinci_core::object_store::MemoryObjectStore;
use davinci_service::{AdminGate, Community, Settings, hash_secret};
use davinci_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router};

const SECRET: &str = "correct horse";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let community = Community::new(store, MemoryObjectStore::new(), Settings::default());
  let gate = AdminGate::new(hash_secret(SECRET).unwrap()).unwrap();
  api_router(AppState::new(community, gate))
}

async fn send(
  app: &Router,
  method: Method,
  uri: &str,
  admin: bool,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if admin {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {SECRET}"));
  }
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn submission_body(name: &str, tier: &str, category: &str) -> Value {
  json!({
    "artist_name": name,
    "contact": format!("{name}@example.com"),
    "skill_tier": tier,
    "category": category,
    "file": B64.encode(PNG),
  })
}

/// Submit and approve; returns the submission id.
async fn approved(app: &Router, name: &str, tier: &str) -> String {
  let (status, body) = send(
    app,
    Method::POST,
    "/submissions",
    false,
    Some(submission_body(name, tier, "weekly")),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let id = body["id"].as_str().unwrap().to_owned();

  let (status, _) = send(app, Method::POST, &format!("/admin/submissions/{id}/approve"), true, None).await;
  assert_eq!(status, StatusCode::OK);
  id
}

// ─── Public ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn community_overview_is_public() {
  let app = app().await;
  let (status, body) = send(&app, Method::GET, "/community", false, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["submissions_open"], true);
  assert_eq!(body["open_categories"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn submission_errors_map_to_statuses() {
  let app = app().await;

  let mut bad = submission_body("Ana", "beginner", "free");
  bad["file"] = json!("***");
  let (status, body) = send(&app, Method::POST, "/submissions", false, Some(bad)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "bad_request");

  let mut pdf = submission_body("Ana", "beginner", "free");
  pdf["file"] = json!(B64.encode(b"%PDF-1.7"));
  let (status, body) = send(&app, Method::POST, "/submissions", false, Some(pdf)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["kind"], "validation");

  let ok = submission_body("Ana", "beginner", "free");
  let (status, _) = send(&app, Method::POST, "/submissions", false, Some(ok.clone())).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = send(&app, Method::POST, "/submissions", false, Some(ok)).await;
  assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
  assert_eq!(body["kind"], "cooldown_active");
  assert!(body["remaining_seconds"].as_i64().unwrap() > 23 * 3600);
}

#[tokio::test]
async fn gallery_shows_only_approved() {
  let app = app().await;
  let id = approved(&app, "Ana", "beginner").await;
  send(&app, Method::POST, "/submissions", false, Some(submission_body("Bia", "advanced", "daily"))).await;

  let (status, body) = send(&app, Method::GET, "/gallery", false, None).await;
  assert_eq!(status, StatusCode::OK);
  let items = body.as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["id"], id);

  let (_, body) = send(&app, Method::GET, "/gallery?tier=advanced", false, None).await;
  assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn public_routes_hide_artist_contacts() {
  let app = app().await;
  let a = approved(&app, "Ana", "beginner").await;
  approved(&app, "Bia", "beginner").await;
  let (_, round) = send(&app, Method::POST, "/admin/rounds", true, Some(json!({}))).await;
  let round_id = round["id"].as_str().unwrap().to_owned();
  let (status, _) = send(
    &app,
    Method::POST,
    &format!("/rounds/{round_id}/ballots"),
    false,
    Some(json!({
      "voter_name": "Vera",
      "voter_contact": "vera@x.com",
      "skill_tier": "beginner",
      "submission_id": a,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, gallery) = send(&app, Method::GET, "/gallery", false, None).await;
  assert_eq!(gallery.as_array().unwrap().len(), 2);
  let (_, active) = send(&app, Method::GET, "/rounds/active", false, None).await;
  let (_, results) =
    send(&app, Method::GET, &format!("/rounds/{round_id}/results"), false, None).await;
  for body in [&gallery, &active, &results] {
    assert!(!body.to_string().contains("@example.com"), "{body}");
  }
  assert!(gallery[0].get("contact").is_none());
  assert!(active["members"][0]["submission"].get("contact").is_none());

  let (_, by_contact) = send(&app, Method::GET, "/gallery?text=ana%40example", false, None).await;
  assert!(by_contact.as_array().unwrap().is_empty());
  let (_, by_name) = send(&app, Method::GET, "/gallery?text=ana", false, None).await;
  assert_eq!(by_name.as_array().unwrap().len(), 1);

  let (_, listed) = send(
    &app,
    Method::GET,
    "/admin/submissions?status=approved&text=ana%40example",
    true,
    None,
  )
  .await;
  assert_eq!(listed[0]["contact"], "ana@example.com");
}

// ─── Admin gate ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_require_bearer_secret() {
  let app = app().await;
  let req = Request::builder()
    .uri("/admin/stats")
    .header(header::AUTHORIZATION, "Bearer wrong")
    .body(Body::empty())
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");

  let (status, body) = send(&app, Method::GET, "/admin/submissions", false, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["kind"], "unauthorized");

  let (status, body) = send(&app, Method::GET, "/admin/stats", true, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn moderation_queue_and_reject() {
  let app = app().await;
  let (_, created) = send(
    &app,
    Method::POST,
    "/submissions",
    false,
    Some(submission_body("Ana", "beginner", "monthly")),
  )
  .await;
  let id = created["id"].as_str().unwrap();

  let (_, pending) = send(&app, Method::GET, "/admin/submissions?text=ANA", true, None).await;
  assert_eq!(pending.as_array().unwrap().len(), 1);

  let (status, _) = send(&app, Method::DELETE, &format!("/admin/submissions/{id}"), true, None).await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(&app, Method::DELETE, &format!("/admin/submissions/{id}"), true, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "submission_not_found");
}

// ─── Voting ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_voting_flow() {
  let app = app().await;
  let a = approved(&app, "Ana", "beginner").await;

  let (status, body) = send(&app, Method::POST, "/admin/rounds", true, Some(json!({}))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "insufficient_candidates");
  assert_eq!(body["found"], 1);

  let b = approved(&app, "Bia", "beginner").await;
  let c = approved(&app, "Cris", "advanced").await;
  let (status, round) =
    send(&app, Method::POST, "/admin/rounds", true, Some(json!({ "title": "Week 1" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let round_id = round["id"].as_str().unwrap().to_owned();

  let (_, active) = send(&app, Method::GET, "/rounds/active", false, None).await;
  assert_eq!(active["round"]["id"], round_id);
  assert_eq!(active["members"].as_array().unwrap().len(), 3);

  let ballot = |submission: &str, tier: &str| {
    json!({
      "voter_name": "Vera",
      "voter_contact": "vera@x.com",
      "skill_tier": tier,
      "submission_id": submission,
    })
  };
  let uri = format!("/rounds/{round_id}/ballots");
  let (status, _) = send(&app, Method::POST, &uri, false, Some(ballot(b.as_str(), "beginner"))).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = send(&app, Method::POST, &uri, false, Some(ballot(a.as_str(), "beginner"))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "already_voted");
  assert_eq!(body["tier"], "beginner");

  let (status, body) = send(&app, Method::POST, &uri, false, Some(ballot(c.as_str(), "beginner"))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["kind"], "tier_mismatch");

  let sheet = json!({
    "voter_name": "Vera",
    "voter_contact": "VERA@x.com",
    "picks": [
      { "skill_tier": "beginner", "submission_id": a },
      { "skill_tier": "advanced", "submission_id": c },
    ],
  });
  let (status, body) =
    send(&app, Method::POST, &format!("/rounds/{round_id}/ballot-sheet"), false, Some(sheet)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["beginner"]["outcome"], "already_voted");
  assert_eq!(body["advanced"]["outcome"], "accepted");

  let (_, status_body) = send(
    &app,
    Method::GET,
    &format!("/rounds/{round_id}/voters/status?contact=vera%40x.com"),
    false,
    None,
  )
  .await;
  assert_eq!(status_body["voted"]["beginner"], true);
  assert_eq!(status_body["voted"]["intermediate"], false);

  let (status, results) =
    send(&app, Method::GET, &format!("/rounds/{round_id}/results"), false, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(results["total_votes"], 2);
  assert_eq!(results["distinct_voters"], 1);
  assert_eq!(results["per_tier"]["beginner"][0]["submission"]["id"], b);
  assert_eq!(results["per_tier"]["beginner"][0]["rank"], 1);

  let (status, report) =
    send(&app, Method::DELETE, &format!("/admin/rounds/{round_id}"), true, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["ballots_deleted"], 2);

  let (status, _) = send(&app, Method::GET, &format!("/rounds/{round_id}/results"), false, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (_, active) = send(&app, Method::GET, "/rounds/active", false, None).await;
  assert!(active.is_null());

  let (_, consistency) = send(&app, Method::GET, "/admin/consistency", true, None).await;
  assert!(consistency["stale_eligible"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn settings_switches_close_voting() {
  let app = app().await;
  approved(&app, "Ana", "beginner").await;
  let b = approved(&app, "Bia", "beginner").await;
  let (_, round) = send(&app, Method::POST, "/admin/rounds", true, Some(json!({}))).await;
  let round_id = round["id"].as_str().unwrap();

  let (status, settings) = send(
    &app,
    Method::PATCH,
    "/admin/settings",
    true,
    Some(json!({ "voting_open": false })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(settings["voting_open"], false);
  assert_eq!(settings["submissions_open"], true);

  let (status, body) = send(
    &app,
    Method::POST,
    &format!("/rounds/{round_id}/ballots"),
    false,
    Some(json!({
      "voter_name": "Vera",
      "voter_contact": "vera@x.com",
      "skill_tier": "beginner",
      "submission_id": b,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["kind"], "voting_closed");

  let (status, closed) =
    send(&app, Method::POST, &format!("/admin/rounds/{round_id}/close"), true, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(closed["active"], false);

  let (_, rounds) = send(&app, Method::GET, "/admin/rounds", true, None).await;
  assert_eq!(rounds.as_array().unwrap().len(), 1);
}
