//! Error types for `gather-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("event not found: {0}")]
  EventNotFound(Uuid),

  #[error("identity not found: {0}")]
  IdentityNotFound(Uuid),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("not the owner of event {0}")]
  NotOwner(Uuid),

  #[error("already enrolled in event {0}")]
  AlreadyEnrolled(Uuid),

  #[error("event {event_id} is fully booked (capacity {capacity})")]
  EventFull { event_id: Uuid, capacity: u32 },

  #[error("capacity {requested} is below current attendance {enrolled}")]
  CapacityBelowAttendance { requested: u32, enrolled: u32 },

  #[error("capacity must be a positive integer, got {0}")]
  InvalidCapacity(i64),

  #[error("backend error: {0}")]
  Backend(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
