//! Identity — a registered actor that can own and enroll in events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered identity. Safe to serialise into API responses — the
/// credential hash lives only in [`IdentityRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub identity_id: Uuid,
  pub username:    String,
  /// Stored lowercase; the case-insensitive login key.
  pub email:       String,
  pub created_at:  DateTime<Utc>,
}

/// Input for registering a new identity. The password has already been
/// hashed by the caller; the store never sees a plaintext credential.
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub username:      String,
  pub email:         String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// An identity bundled with its stored credential hash.
///
/// Returned only by the login lookup path. Deliberately not `Serialize`:
/// the hash must never leave the process boundary.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
  pub identity:      Identity,
  pub password_hash: String,
}

/// The summary of an identity embedded in event views (owner, attendees).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRef {
  pub identity_id: Uuid,
  pub username:    String,
  pub email:       String,
}

impl From<Identity> for IdentityRef {
  fn from(i: Identity) -> Self {
    IdentityRef {
      identity_id: i.identity_id,
      username:    i.username,
      email:       i.email,
    }
  }
}
