//! The `Store` trait — identities and events behind one abstraction.
//!
//! The trait is implemented by storage backends (e.g. `gather-store-sqlite`).
//! The API layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  event::{Event, EventPatch, EventView, NewEvent},
  identity::{Identity, IdentityRecord, NewIdentity},
};

/// Abstraction over a Gather storage backend.
///
/// Every mutating operation is one logical transaction: it either fully
/// applies or changes nothing observable. In particular [`Store::enroll`]
/// must run its read-check-append sequence atomically per event, so that
/// two attempts racing for the last open slot are serialised — one wins,
/// the other observes a full event, and the attendee count never exceeds
/// capacity.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait Store: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  /// Register a new identity. The email must be unique (case-insensitive;
  /// callers pass it lowercased) — a duplicate converts to
  /// [`Error::EmailTaken`](crate::Error::EmailTaken).
  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Retrieve an identity by UUID. Returns `None` if not found.
  fn get_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Look up an identity by email, credential hash included — the login
  /// path. Returns `None` if no such email is registered; the caller is
  /// responsible for collapsing that with a failed hash verification into
  /// one indistinguishable failure.
  fn identity_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<IdentityRecord>, Self::Error>> + Send + 'a;

  // ── Events ────────────────────────────────────────────────────────────

  /// Create and persist a new event with an empty attendee list.
  fn create_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<EventView, Self::Error>> + Send + '_;

  /// Retrieve the raw event record by UUID. Returns `None` if not found.
  /// Used by the mutation paths, which gate on ownership before writing.
  fn get_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Retrieve an event with owner and attendees resolved to identity
  /// summaries. Returns `None` if not found.
  fn event_view(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<EventView>, Self::Error>> + Send + '_;

  /// List all events, oldest first.
  fn list_events(
    &self,
  ) -> impl Future<Output = Result<Vec<EventView>, Self::Error>> + Send + '_;

  /// List the events owned by `owner_id`, oldest first.
  fn events_by_owner(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<EventView>, Self::Error>> + Send + '_;

  /// Apply a partial update to an event. Field semantics and capacity
  /// revalidation follow [`Event::apply`]; the load-apply-write runs as
  /// one transaction.
  fn update_event(
    &self,
    id: Uuid,
    patch: EventPatch,
  ) -> impl Future<Output = Result<EventView, Self::Error>> + Send + '_;

  /// Delete an event and its attendee list as one atomic unit.
  fn delete_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The enrollment primitive: add `identity_id` to the event's attendee
  /// list iff it is not already present and the event is not full, then
  /// return the updated view.
  ///
  /// Failure conditions, in check order:
  /// [`EventNotFound`](crate::Error::EventNotFound),
  /// [`AlreadyEnrolled`](crate::Error::AlreadyEnrolled),
  /// [`EventFull`](crate::Error::EventFull).
  fn enroll(
    &self,
    event_id: Uuid,
    identity_id: Uuid,
  ) -> impl Future<Output = Result<EventView, Self::Error>> + Send + '_;
}
