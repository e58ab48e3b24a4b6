//! Handlers for `/api/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/users/register` | Body: `{"username","email","password"}` |
//! | `POST` | `/api/users/login` | Body: `{"email","password"}` |
//! | `GET`  | `/api/users/profile` | Bearer token required |

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use gather_core::{
  identity::{Identity, NewIdentity},
  store::Store,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::AuthIdentity, error::ApiError};

// ─── Response bodies ─────────────────────────────────────────────────────────

/// Identity plus a fresh session token — returned by register and login.
#[derive(Debug, Serialize)]
pub struct SessionBody {
  pub id:       Uuid,
  pub username: String,
  pub email:    String,
  pub token:    String,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody {
  pub id:       Uuid,
  pub username: String,
  pub email:    String,
}

fn session_body(identity: Identity, token: String) -> SessionBody {
  SessionBody {
    id:       identity.identity_id,
    username: identity.username,
    email:    identity.email,
    token,
  }
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username: Option<String>,
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `POST /api/users/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let (Some(username), Some(email), Some(password)) = (
    body.username.filter(|s| !s.is_empty()),
    body.email.filter(|s| !s.is_empty()),
    body.password.filter(|s| !s.is_empty()),
  ) else {
    return Err(ApiError::Validation(
      "please provide all required fields".into(),
    ));
  };

  // The email is the case-insensitive login key; normalise before storing.
  let email = email.trim().to_lowercase();

  let salt = SaltString::generate(&mut OsRng);
  let password_hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?
    .to_string();

  let identity = state
    .store
    .create_identity(NewIdentity { username, email, password_hash })
    .await
    .map_err(ApiError::store)?;

  let token = state.tokens.issue(&identity)?;
  Ok((StatusCode::CREATED, Json(session_body(identity, token))))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `POST /api/users/login`
///
/// Every credential failure — unknown email, undecodable stored hash, or
/// wrong password — collapses into the same
/// [`InvalidCredentials`](ApiError::InvalidCredentials) response, so the
/// endpoint cannot be used to enumerate registered emails.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<SessionBody>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let (Some(email), Some(password)) = (
    body.email.filter(|s| !s.is_empty()),
    body.password.filter(|s| !s.is_empty()),
  ) else {
    return Err(ApiError::Validation(
      "please provide email and password".into(),
    ));
  };

  let record = state
    .store
    .identity_by_email(&email.trim().to_lowercase())
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::InvalidCredentials)?;

  let parsed_hash = PasswordHash::new(&record.password_hash)
    .map_err(|_| ApiError::InvalidCredentials)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::InvalidCredentials)?;

  let token = state.tokens.issue(&record.identity)?;
  Ok(Json(session_body(record.identity, token)))
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// `GET /api/users/profile` — the bearer's own identity, credential excluded.
pub async fn profile<S>(
  AuthIdentity(identity): AuthIdentity,
) -> Result<Json<ProfileBody>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  Ok(Json(ProfileBody {
    id:       identity.identity_id,
    username: identity.username,
    email:    identity.email,
  }))
}
