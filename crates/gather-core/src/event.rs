//! Event — a capacity-bounded gathering record owned by one identity.
//!
//! The attendee list is ordered by enrollment (first come, first served)
//! and is bounded by `capacity` at all times. Mutation goes through
//! [`EventPatch`] so that "leave unchanged" and "set to this value" are
//! distinct, and through the store's enrollment primitive for attendees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, identity::IdentityRef};

// ─── Event ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:     Uuid,
  pub title:        String,
  pub description:  String,
  pub location:     String,
  pub date:         DateTime<Utc>,
  /// Maximum number of attendees. Always positive.
  pub capacity:     u32,
  /// Relative path under `/uploads`, if an image was attached.
  pub image_path:   Option<String>,
  /// Set at creation, never reassigned.
  pub owner_id:     Uuid,
  /// Identity references in enrollment order. No duplicates; length is
  /// bounded by `capacity`.
  pub attendee_ids: Vec<Uuid>,
  pub created_at:   DateTime<Utc>,
}

impl Event {
  pub fn is_full(&self) -> bool { self.attendee_ids.len() as u32 >= self.capacity }

  pub fn is_attending(&self, identity_id: Uuid) -> bool {
    self.attendee_ids.contains(&identity_id)
  }

  /// Apply a partial update, field by field. `None` keeps the stored value.
  ///
  /// Rejects a capacity of zero, and rejects lowering capacity below the
  /// current attendee count — the `attendees <= capacity` invariant holds
  /// across updates, not just enrollments.
  pub fn apply(&mut self, patch: EventPatch) -> Result<()> {
    if let Some(capacity) = patch.capacity {
      if capacity == 0 {
        return Err(Error::InvalidCapacity(0));
      }
      let enrolled = self.attendee_ids.len() as u32;
      if capacity < enrolled {
        return Err(Error::CapacityBelowAttendance { requested: capacity, enrolled });
      }
      self.capacity = capacity;
    }
    if let Some(title) = patch.title {
      self.title = title;
    }
    if let Some(description) = patch.description {
      self.description = description;
    }
    if let Some(location) = patch.location {
      self.location = location;
    }
    if let Some(date) = patch.date {
      self.date = date;
    }
    if let Some(image_path) = patch.image_path {
      self.image_path = Some(image_path);
    }
    Ok(())
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for creating an event. The attendee list starts empty.
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub title:       String,
  pub description: String,
  pub location:    String,
  pub date:        DateTime<Utc>,
  pub capacity:    u32,
  pub image_path:  Option<String>,
  pub owner_id:    Uuid,
}

/// A partial update. Each field is independently `Some(new value)` or
/// `None` ("leave unchanged") — an empty string is a legitimate new value,
/// not a keep-old marker.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub location:    Option<String>,
  pub date:        Option<DateTime<Utc>>,
  pub capacity:    Option<u32>,
  pub image_path:  Option<String>,
}

impl EventPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.location.is_none()
      && self.date.is_none()
      && self.capacity.is_none()
      && self.image_path.is_none()
  }
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// An event with its owner and attendees resolved to identity summaries —
/// the representation returned by the read and enrollment paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
  pub event:     Event,
  pub owner:     IdentityRef,
  /// Same order as `event.attendee_ids`.
  pub attendees: Vec<IdentityRef>,
}
