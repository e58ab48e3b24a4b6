//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Status codes are derived from the error discriminant, never from message
//! text. Conflict-class failures (duplicate email, already enrolled, event
//! full) are reported as 400 to match the wire contract clients expect.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("validation error: {0}")]
  Validation(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// Bad login credentials. One variant for both unknown email and wrong
  /// password, so responses do not reveal which emails are registered.
  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("not authorized, token missing")]
  TokenMissing,

  #[error("token expired, please log in again")]
  TokenExpired,

  #[error("invalid token, not authorized")]
  TokenInvalid,

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Translate a store failure into the client-facing taxonomy.
  pub fn store<E: Into<gather_core::Error>>(e: E) -> Self {
    use gather_core::Error as Core;
    match e.into() {
      Core::EventNotFound(id) => {
        ApiError::NotFound(format!("event {id} not found"))
      }
      Core::IdentityNotFound(id) => {
        ApiError::NotFound(format!("identity {id} not found"))
      }
      Core::EmailTaken(email) => {
        ApiError::Conflict(format!("email {email} is already registered"))
      }
      Core::NotOwner(_) => ApiError::Forbidden(
        "you are not authorized to perform this action".into(),
      ),
      Core::AlreadyEnrolled(_) => {
        ApiError::Conflict("you have already RSVP'd to this event".into())
      }
      Core::EventFull { .. } => {
        ApiError::Conflict("this event is fully booked".into())
      }
      Core::CapacityBelowAttendance { requested, enrolled } => {
        ApiError::Conflict(format!(
          "capacity {requested} is below current attendance {enrolled}"
        ))
      }
      Core::InvalidCapacity(got) => ApiError::Validation(format!(
        "capacity must be a positive integer, got {got}"
      )),
      Core::Backend(m) => ApiError::Internal(m),
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::InvalidCredentials
      | ApiError::TokenMissing
      | ApiError::TokenExpired
      | ApiError::TokenInvalid => StatusCode::UNAUTHORIZED,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn is_token_failure(&self) -> bool {
    matches!(
      self,
      ApiError::TokenMissing | ApiError::TokenExpired | ApiError::TokenInvalid
    )
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let challenge = self.is_token_failure();
    let mut res =
      (status, Json(json!({ "error": self.to_string() }))).into_response();
    if challenge {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"gather\""),
      );
    }
    res
  }
}
