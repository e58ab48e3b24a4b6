//! The owner-authorization gate.
//!
//! A single pure predicate used before every mutating operation on an
//! owned resource. It compares stable identifier values, so the outcome is
//! independent of which copy of the event record was loaded.

use uuid::Uuid;

use crate::{Error, Result, event::Event};

/// Succeeds iff `actor_id` owns `event`. Call after the event has been
/// loaded and before any mutation is attempted.
///
/// Failure is [`Error::NotOwner`] — distinct from [`Error::EventNotFound`]
/// (the event exists, the actor lacks rights) and from backend faults.
pub fn authorize_owner(event: &Event, actor_id: Uuid) -> Result<()> {
  if event.owner_id == actor_id {
    Ok(())
  } else {
    Err(Error::NotOwner(event.event_id))
  }
}
