//! Signed session tokens (JWT, HS256).
//!
//! A token carries the identity's stable id and username and expires after
//! the configured validity window (30 days by default, matching the
//! reference clients).

use chrono::{Duration, Utc};
use gather_core::identity::Identity;
use jsonwebtoken::{
  DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// The claims encoded into a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// The identity's stable id.
  pub sub:      Uuid,
  pub username: String,
  pub iat:      i64,
  pub exp:      i64,
}

/// Encoding/decoding key pair plus the validity window for issued tokens.
pub struct TokenKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  validity: Duration,
}

impl TokenKeys {
  pub fn new(secret: &[u8], validity_days: i64) -> Self {
    TokenKeys {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validity: Duration::days(validity_days),
    }
  }

  /// Issue a fresh token for `identity`.
  pub fn issue(&self, identity: &Identity) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub:      identity.identity_id,
      username: identity.username.clone(),
      iat:      now.timestamp(),
      exp:      (now + self.validity).timestamp(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
      .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
  }

  /// Verify signature and expiry, returning the embedded claims.
  ///
  /// Expired and malformed tokens are distinct conditions — clients prompt
  /// a re-login for the former and discard the token for the latter.
  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
      .map(|data| data.claims)
      .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::TokenExpired,
        _ => ApiError::TokenInvalid,
      })
  }
}
