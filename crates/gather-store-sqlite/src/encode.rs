//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Capacity is a plain INTEGER.

use chrono::{DateTime, Utc};
use gather_core::{
  event::{Event, EventView},
  identity::{Identity, IdentityRef},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Capacity ────────────────────────────────────────────────────────────────

pub fn decode_capacity(raw: i64) -> Result<u32> {
  u32::try_from(raw)
    .ok()
    .filter(|c| *c > 0)
    .ok_or(Error::Core(gather_core::Error::InvalidCapacity(raw)))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id: String,
  pub username:    String,
  pub email:       String,
  pub created_at:  String,
}

impl RawIdentity {
  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      identity_id: decode_uuid(&self.identity_id)?,
      username:    self.username,
      email:       self.email,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// The identity summary columns joined into event views.
pub struct RawIdentityRef {
  pub identity_id: String,
  pub username:    String,
  pub email:       String,
}

impl RawIdentityRef {
  pub fn into_ref(self) -> Result<IdentityRef> {
    Ok(IdentityRef {
      identity_id: decode_uuid(&self.identity_id)?,
      username:    self.username,
      email:       self.email,
    })
  }
}

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:    String,
  pub title:       String,
  pub description: String,
  pub location:    String,
  pub date:        String,
  pub capacity:    i64,
  pub image_path:  Option<String>,
  pub owner_id:    String,
  pub created_at:  String,
}

impl RawEvent {
  /// Combine the event row with its ordered attendee id strings.
  pub fn into_event(self, attendee_ids: Vec<String>) -> Result<Event> {
    Ok(Event {
      event_id:     decode_uuid(&self.event_id)?,
      title:        self.title,
      description:  self.description,
      location:     self.location,
      date:         decode_dt(&self.date)?,
      capacity:     decode_capacity(self.capacity)?,
      image_path:   self.image_path,
      owner_id:     decode_uuid(&self.owner_id)?,
      attendee_ids: attendee_ids
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<_>>()?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// An event row joined with its owner and ordered attendee summaries.
pub struct RawEventView {
  pub event:     RawEvent,
  pub owner:     RawIdentityRef,
  pub attendees: Vec<RawIdentityRef>,
}

impl RawEventView {
  pub fn into_view(self) -> Result<EventView> {
    let attendee_ids = self
      .attendees
      .iter()
      .map(|a| a.identity_id.clone())
      .collect();
    Ok(EventView {
      event:     self.event.into_event(attendee_ids)?,
      owner:     self.owner.into_ref()?,
      attendees: self
        .attendees
        .into_iter()
        .map(RawIdentityRef::into_ref)
        .collect::<Result<_>>()?,
    })
  }
}
