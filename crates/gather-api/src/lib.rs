//! JSON REST API for Gather.
//!
//! Exposes an axum [`Router`] backed by any [`gather_core::store::Store`].
//! TLS and transport concerns are the caller's responsibility; static
//! serving of uploaded images is wired up by the server binary.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(gather_api::api_router(state.clone()))
//! ```

pub mod auth;
pub mod error;
pub mod events;
pub mod token;
pub mod upload;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use gather_core::store::Store;

pub use error::ApiError;
use token::TokenKeys;
use upload::ImageStore;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: Store> {
  pub store:  Arc<S>,
  pub tokens: Arc<TokenKeys>,
  pub images: Arc<ImageStore>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: Store + Clone + Send + Sync + 'static,
{
  Router::new()
    // Users
    .route("/api/users/register", post(users::register::<S>))
    .route("/api/users/login", post(users::login::<S>))
    .route("/api/users/profile", get(users::profile::<S>))
    // Events
    .route("/api/events/create", post(events::create::<S>))
    .route("/api/events/all", get(events::list_all::<S>))
    .route("/api/events/my-events", get(events::my_events::<S>))
    .route(
      "/api/events/{id}",
      get(events::get_one::<S>)
        .put(events::update::<S>)
        .delete(events::delete::<S>),
    )
    .route("/api/events/{id}/rsvp", post(events::rsvp::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use gather_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  const SECRET: &[u8] = b"test-secret";

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let dir = std::env::temp_dir().join(format!("gather-api-{}", Uuid::new_v4()));
    AppState {
      store:  Arc::new(store),
      tokens: Arc::new(TokenKeys::new(SECRET, 30)),
      images: Arc::new(ImageStore::create(dir).await.unwrap()),
    }
  }

  async fn oneshot_json(
    state:  AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    api_router(state).oneshot(req).await.unwrap()
  }

  /// Hand-rolled `multipart/form-data` body from text fields.
  fn multipart_body(fields: &[(&str, &str)]) -> (String, String) {
    const BOUNDARY: &str = "gatherboundary";
    let mut body = String::new();
    for (name, value) in fields {
      body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; \
         name=\"{name}\"\r\n\r\n{value}\r\n"
      ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
  }

  async fn oneshot_form(
    state:  AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    fields: &[(&str, &str)],
  ) -> axum::response::Response {
    let (content_type, body) = multipart_body(fields);
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, content_type);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = builder.body(Body::from(body)).unwrap();
    api_router(state).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  /// Register `username` and return `(token, identity id)`.
  async fn register(
    state: &AppState<SqliteStore>,
    username: &str,
  ) -> (String, Uuid) {
    let resp = oneshot_json(
      state.clone(),
      "POST",
      "/api/users/register",
      None,
      Some(json!({
        "username": username,
        "email":    format!("{username}@example.com"),
        "password": "hunter2!",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    (
      body["token"].as_str().unwrap().to_string(),
      body["id"].as_str().unwrap().parse().unwrap(),
    )
  }

  /// Create an event with capacity `capacity` and return its id.
  async fn create_event(
    state: &AppState<SqliteStore>,
    token: &str,
    title: &str,
    capacity: u32,
  ) -> Uuid {
    let cap = capacity.to_string();
    let resp = oneshot_form(
      state.clone(),
      "POST",
      "/api/events/create",
      Some(token),
      &[
        ("title", title),
        ("description", "a gathering"),
        ("location", "Town Hall"),
        ("date", "2026-10-01T18:00"),
        ("maxAttendees", cap.as_str()),
      ],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await["id"].as_str().unwrap().parse().unwrap()
  }

  // ── Register ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_returns_identity_and_token() {
    let state = make_state().await;
    let resp = oneshot_json(
      state,
      "POST",
      "/api/users/register",
      None,
      Some(json!({
        "username": "alice",
        "email":    "Alice@Example.com",
        "password": "hunter2!",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = json_body(resp).await;
    assert_eq!(body["username"], "alice");
    // Emails are normalised to lowercase on the way in.
    assert_eq!(body["email"], "alice@example.com");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body.get("password").is_none());
  }

  #[tokio::test]
  async fn register_duplicate_email_is_400() {
    let state = make_state().await;
    register(&state, "alice").await;

    let resp = oneshot_json(
      state,
      "POST",
      "/api/users/register",
      None,
      Some(json!({
        "username": "alice2",
        "email":    "alice@example.com",
        "password": "other",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("already registered"));
  }

  #[tokio::test]
  async fn register_missing_field_is_400() {
    let state = make_state().await;
    let resp = oneshot_json(
      state,
      "POST",
      "/api/users/register",
      None,
      Some(json!({ "username": "alice", "password": "hunter2!" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Login ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn login_with_correct_credentials_succeeds() {
    let state = make_state().await;
    let (_, id) = register(&state, "alice").await;

    let resp = oneshot_json(
      state,
      "POST",
      "/api/users/login",
      None,
      Some(json!({ "email": "alice@example.com", "password": "hunter2!" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["id"].as_str().unwrap().parse::<Uuid>().unwrap(), id);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
  }

  #[tokio::test]
  async fn login_is_case_insensitive_on_email() {
    let state = make_state().await;
    register(&state, "alice").await;

    let resp = oneshot_json(
      state,
      "POST",
      "/api/users/login",
      None,
      Some(json!({ "email": "ALICE@EXAMPLE.COM", "password": "hunter2!" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn login_failures_share_one_message() {
    let state = make_state().await;
    register(&state, "alice").await;

    let wrong_password = oneshot_json(
      state.clone(),
      "POST",
      "/api/users/login",
      None,
      Some(json!({ "email": "alice@example.com", "password": "nope" })),
    )
    .await;
    let unknown_email = oneshot_json(
      state,
      "POST",
      "/api/users/login",
      None,
      Some(json!({ "email": "nobody@example.com", "password": "nope" })),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    // Identical bodies, so the endpoint cannot enumerate emails.
    assert_eq!(
      json_body(wrong_password).await,
      json_body(unknown_email).await
    );
  }

  // ── Profile ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn profile_returns_bearer_identity() {
    let state = make_state().await;
    let (token, id) = register(&state, "alice").await;

    let resp =
      oneshot_json(state, "GET", "/api/users/profile", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["id"].as_str().unwrap().parse::<Uuid>().unwrap(), id);
    assert_eq!(body["username"], "alice");
  }

  #[tokio::test]
  async fn profile_without_token_is_401_with_challenge() {
    let state = make_state().await;
    let resp = oneshot_json(state, "GET", "/api/users/profile", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn profile_with_expired_token_is_401() {
    let state = make_state().await;
    let (_, id) = register(&state, "alice").await;
    let identity = state.store.get_identity(id).await.unwrap().unwrap();

    // Same secret, validity far enough in the past to defeat decode leeway.
    let stale = TokenKeys::new(SECRET, -2).issue(&identity).unwrap();
    let resp =
      oneshot_json(state, "GET", "/api/users/profile", Some(&stale), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("expired"));
  }

  #[tokio::test]
  async fn token_for_unknown_identity_is_404() {
    let state = make_state().await;
    let ghost = gather_core::identity::Identity {
      identity_id: Uuid::new_v4(),
      username:    "ghost".into(),
      email:       "ghost@example.com".into(),
      created_at:  chrono::Utc::now(),
    };
    let token = state.tokens.issue(&ghost).unwrap();

    let resp =
      oneshot_json(state, "GET", "/api/users/profile", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Event create ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_event_returns_full_body() {
    let state = make_state().await;
    let (token, id) = register(&state, "alice").await;

    let resp = oneshot_form(
      state,
      "POST",
      "/api/events/create",
      Some(&token),
      &[
        ("title", "Board Games Night"),
        ("description", "Bring snacks"),
        ("location", "Community Center"),
        ("date", "2026-11-05T19:30"),
        ("maxAttendees", "12"),
      ],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = json_body(resp).await;
    assert_eq!(body["title"], "Board Games Night");
    assert_eq!(body["maxAttendees"], 12);
    assert_eq!(
      body["createdBy"]["id"].as_str().unwrap().parse::<Uuid>().unwrap(),
      id
    );
    assert_eq!(body["attendees"].as_array().unwrap().len(), 0);
    assert!(body["imageUrl"].is_null());
  }

  #[tokio::test]
  async fn create_event_without_token_is_401() {
    let state = make_state().await;
    let resp = oneshot_form(
      state,
      "POST",
      "/api/events/create",
      None,
      &[("title", "t")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn create_event_missing_field_is_400() {
    let state = make_state().await;
    let (token, _) = register(&state, "alice").await;

    let resp = oneshot_form(
      state,
      "POST",
      "/api/events/create",
      Some(&token),
      &[("title", "No date"), ("description", "d"), ("location", "l")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn create_event_rejects_zero_capacity() {
    let state = make_state().await;
    let (token, _) = register(&state, "alice").await;

    let resp = oneshot_form(
      state,
      "POST",
      "/api/events/create",
      Some(&token),
      &[
        ("title", "t"),
        ("description", "d"),
        ("location", "l"),
        ("date", "2026-11-05T19:30"),
        ("maxAttendees", "0"),
      ],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Event reads ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn list_all_is_open_to_anonymous_callers() {
    let state = make_state().await;
    let (token, _) = register(&state, "alice").await;
    create_event(&state, &token, "One", 5).await;
    create_event(&state, &token, "Two", 5).await;

    let resp = oneshot_json(state, "GET", "/api/events/all", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn my_events_is_scoped_to_the_bearer() {
    let state = make_state().await;
    let (alice, _) = register(&state, "alice").await;
    let (bob, _) = register(&state, "bob").await;
    create_event(&state, &alice, "Alice's", 5).await;
    create_event(&state, &bob, "Bob's", 5).await;

    let resp =
      oneshot_json(state, "GET", "/api/events/my-events", Some(&alice), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["title"], "Alice's");
  }

  #[tokio::test]
  async fn get_unknown_event_is_404() {
    let state = make_state().await;
    let resp = oneshot_json(
      state,
      "GET",
      &format!("/api/events/{}", Uuid::new_v4()),
      None,
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Event update ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn update_changes_only_submitted_fields() {
    let state = make_state().await;
    let (token, _) = register(&state, "alice").await;
    let id = create_event(&state, &token, "Original", 5).await;

    let resp = oneshot_form(
      state.clone(),
      "PUT",
      &format!("/api/events/{id}"),
      Some(&token),
      &[("location", "New Venue")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["location"], "New Venue");
    assert_eq!(body["title"], "Original");
    assert_eq!(body["maxAttendees"], 5);
  }

  #[tokio::test]
  async fn update_by_non_owner_is_403_and_changes_nothing() {
    let state = make_state().await;
    let (alice, _) = register(&state, "alice").await;
    let (bob, _) = register(&state, "bob").await;
    let id = create_event(&state, &alice, "Alice's", 5).await;

    let resp = oneshot_form(
      state.clone(),
      "PUT",
      &format!("/api/events/{id}"),
      Some(&bob),
      &[("title", "Hijacked")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let after =
      oneshot_json(state, "GET", &format!("/api/events/{id}"), None, None).await;
    assert_eq!(json_body(after).await["title"], "Alice's");
  }

  #[tokio::test]
  async fn update_unknown_event_is_404_even_with_a_token() {
    let state = make_state().await;
    let (token, _) = register(&state, "alice").await;

    let resp = oneshot_form(
      state,
      "PUT",
      &format!("/api/events/{}", Uuid::new_v4()),
      Some(&token),
      &[("title", "t")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn shrinking_capacity_below_attendance_is_400() {
    let state = make_state().await;
    let (alice, _) = register(&state, "alice").await;
    let (bob, _) = register(&state, "bob").await;
    let (carol, _) = register(&state, "carol").await;
    let id = create_event(&state, &alice, "Popular", 5).await;

    for t in [&bob, &carol] {
      let resp = oneshot_json(
        state.clone(),
        "POST",
        &format!("/api/events/{id}/rsvp"),
        Some(t),
        None,
      )
      .await;
      assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = oneshot_form(
      state.clone(),
      "PUT",
      &format!("/api/events/{id}"),
      Some(&alice),
      &[("maxAttendees", "1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Attendance and capacity both survive the failed shrink.
    let after =
      oneshot_json(state, "GET", &format!("/api/events/{id}"), None, None).await;
    let body = json_body(after).await;
    assert_eq!(body["maxAttendees"], 5);
    assert_eq!(body["attendees"].as_array().unwrap().len(), 2);
  }

  // ── Event delete ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_removes_the_event() {
    let state = make_state().await;
    let (token, _) = register(&state, "alice").await;
    let id = create_event(&state, &token, "Doomed", 5).await;

    let resp = oneshot_json(
      state.clone(),
      "DELETE",
      &format!("/api/events/{id}"),
      Some(&token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["message"], "Event deleted successfully");

    let after =
      oneshot_json(state, "GET", &format!("/api/events/{id}"), None, None).await;
    assert_eq!(after.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn delete_by_non_owner_is_403() {
    let state = make_state().await;
    let (alice, _) = register(&state, "alice").await;
    let (bob, _) = register(&state, "bob").await;
    let id = create_event(&state, &alice, "Alice's", 5).await;

    let resp = oneshot_json(
      state,
      "DELETE",
      &format!("/api/events/{id}"),
      Some(&bob),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  // ── RSVP ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn rsvp_enrolls_the_bearer() {
    let state = make_state().await;
    let (alice, _) = register(&state, "alice").await;
    let (bob, bob_id) = register(&state, "bob").await;
    let id = create_event(&state, &alice, "Party", 5).await;

    let resp = oneshot_json(
      state,
      "POST",
      &format!("/api/events/{id}/rsvp"),
      Some(&bob),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["message"], "RSVP successful");
    let attendees = body["event"]["attendees"].as_array().unwrap();
    assert_eq!(attendees.len(), 1);
    assert_eq!(
      attendees[0]["id"].as_str().unwrap().parse::<Uuid>().unwrap(),
      bob_id
    );
  }

  #[tokio::test]
  async fn rsvp_twice_is_400_and_enrollment_stands() {
    let state = make_state().await;
    let (alice, _) = register(&state, "alice").await;
    let (bob, _) = register(&state, "bob").await;
    let id = create_event(&state, &alice, "Party", 5).await;

    let first = oneshot_json(
      state.clone(),
      "POST",
      &format!("/api/events/{id}/rsvp"),
      Some(&bob),
      None,
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = oneshot_json(
      state.clone(),
      "POST",
      &format!("/api/events/{id}/rsvp"),
      Some(&bob),
      None,
    )
    .await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);

    let after =
      oneshot_json(state, "GET", &format!("/api/events/{id}"), None, None).await;
    assert_eq!(json_body(after).await["attendees"].as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn rsvp_to_full_event_is_400() {
    let state = make_state().await;
    let (alice, _) = register(&state, "alice").await;
    let (bob, _) = register(&state, "bob").await;
    let (carol, _) = register(&state, "carol").await;
    let id = create_event(&state, &alice, "Tiny", 1).await;

    let first = oneshot_json(
      state.clone(),
      "POST",
      &format!("/api/events/{id}/rsvp"),
      Some(&bob),
      None,
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = oneshot_json(
      state,
      "POST",
      &format!("/api/events/{id}/rsvp"),
      Some(&carol),
      None,
    )
    .await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body = json_body(second).await;
    assert!(body["error"].as_str().unwrap().contains("fully booked"));
  }

  #[tokio::test]
  async fn rsvp_to_unknown_event_is_404() {
    let state = make_state().await;
    let (token, _) = register(&state, "alice").await;

    let resp = oneshot_json(
      state,
      "POST",
      &format!("/api/events/{}/rsvp", Uuid::new_v4()),
      Some(&token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
