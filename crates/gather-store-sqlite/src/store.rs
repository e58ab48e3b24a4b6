//! [`SqliteStore`] — the SQLite implementation of [`Store`].
//!
//! Every mutating operation runs as a single `rusqlite` transaction inside
//! one [`tokio_rusqlite::Connection::call`] closure. Because all calls are
//! funnelled through one connection thread, the enrollment read-check-append
//! is serialised per store: concurrent RSVPs for the last slot cannot both
//! observe a free seat.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gather_core::{
  event::{Event, EventPatch, EventView, NewEvent},
  identity::{Identity, IdentityRecord, NewIdentity},
  store::Store,
};

use crate::{
  Error, Result,
  encode::{
    RawEvent, RawEventView, RawIdentity, RawIdentityRef, decode_capacity,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Gather store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row queries (shared by several operations) ──────────────────────────────

fn query_event_row(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawEvent>> {
  conn
    .query_row(
      "SELECT event_id, title, description, location, date, capacity,
              image_path, owner_id, created_at
       FROM events WHERE event_id = ?1",
      rusqlite::params![id],
      |row| {
        Ok(RawEvent {
          event_id:    row.get(0)?,
          title:       row.get(1)?,
          description: row.get(2)?,
          location:    row.get(3)?,
          date:        row.get(4)?,
          capacity:    row.get(5)?,
          image_path:  row.get(6)?,
          owner_id:    row.get(7)?,
          created_at:  row.get(8)?,
        })
      },
    )
    .optional()
}

/// Attendee identity ids in enrollment order.
fn query_attendee_ids(
  conn: &rusqlite::Connection,
  event_id: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(
    "SELECT identity_id FROM attendees WHERE event_id = ?1 ORDER BY rowid",
  )?;
  stmt
    .query_map(rusqlite::params![event_id], |row| row.get(0))?
    .collect()
}

fn query_identity_ref(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawIdentityRef>> {
  conn
    .query_row(
      "SELECT identity_id, username, email FROM identities WHERE identity_id = ?1",
      rusqlite::params![id],
      |row| {
        Ok(RawIdentityRef {
          identity_id: row.get(0)?,
          username:    row.get(1)?,
          email:       row.get(2)?,
        })
      },
    )
    .optional()
}

fn query_attendee_refs(
  conn: &rusqlite::Connection,
  event_id: &str,
) -> rusqlite::Result<Vec<RawIdentityRef>> {
  let mut stmt = conn.prepare(
    "SELECT i.identity_id, i.username, i.email
     FROM attendees a
     JOIN identities i ON i.identity_id = a.identity_id
     WHERE a.event_id = ?1
     ORDER BY a.rowid",
  )?;
  stmt
    .query_map(rusqlite::params![event_id], |row| {
      Ok(RawIdentityRef {
        identity_id: row.get(0)?,
        username:    row.get(1)?,
        email:       row.get(2)?,
      })
    })?
    .collect()
}

/// The event row joined with its owner and attendee summaries.
fn query_view(
  conn: &rusqlite::Connection,
  event_id: &str,
) -> rusqlite::Result<Option<RawEventView>> {
  let Some(event) = query_event_row(conn, event_id)? else {
    return Ok(None);
  };
  let Some(owner) = query_identity_ref(conn, &event.owner_id)? else {
    return Ok(None);
  };
  let attendees = query_attendee_refs(conn, event_id)?;
  Ok(Some(RawEventView { event, owner, attendees }))
}

/// Wrap a decode failure for transport out of a `call` closure.
fn db_other(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Closure outcomes ────────────────────────────────────────────────────────
//
// Domain conditions are decided inside the transaction but reported as plain
// values, so the closures only ever fail with database errors.

enum RegisterOutcome {
  Created,
  EmailTaken,
}

enum UpdateOutcome {
  Missing,
  Rejected(gather_core::Error),
  Updated(RawEventView),
}

enum DeleteOutcome {
  Missing,
  Deleted,
}

enum EnrollOutcome {
  Missing,
  Already,
  Full(i64),
  Enrolled(RawEventView),
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn create_identity(&self, input: NewIdentity) -> Result<Identity> {
    let identity = Identity {
      identity_id: Uuid::new_v4(),
      username:    input.username,
      email:       input.email,
      created_at:  Utc::now(),
    };

    let id_str        = encode_uuid(identity.identity_id);
    let username      = identity.username.clone();
    let email         = identity.email.clone();
    let password_hash = input.password_hash;
    let at_str        = encode_dt(identity.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM identities WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(RegisterOutcome::EmailTaken);
        }

        tx.execute(
          "INSERT INTO identities (identity_id, username, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, username, email, password_hash, at_str],
        )?;
        tx.commit()?;
        Ok(RegisterOutcome::Created)
      })
      .await?;

    match outcome {
      RegisterOutcome::Created => Ok(identity),
      RegisterOutcome::EmailTaken => {
        Err(Error::Core(gather_core::Error::EmailTaken(identity.email)))
      }
    }
  }

  async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        conn
          .query_row(
            "SELECT identity_id, username, email, created_at
             FROM identities WHERE identity_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawIdentity {
                identity_id: row.get(0)?,
                username:    row.get(1)?,
                email:       row.get(2)?,
                created_at:  row.get(3)?,
              })
            },
          )
          .optional()
          .map_err(Into::into)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn identity_by_email(&self, email: &str) -> Result<Option<IdentityRecord>> {
    let email = email.to_owned();

    let raw: Option<(RawIdentity, String)> = self
      .conn
      .call(move |conn| {
        conn
          .query_row(
            "SELECT identity_id, username, email, created_at, password_hash
             FROM identities WHERE email = ?1",
            rusqlite::params![email],
            |row| {
              Ok((
                RawIdentity {
                  identity_id: row.get(0)?,
                  username:    row.get(1)?,
                  email:       row.get(2)?,
                  created_at:  row.get(3)?,
                },
                row.get(4)?,
              ))
            },
          )
          .optional()
          .map_err(Into::into)
      })
      .await?;

    raw
      .map(|(raw, password_hash)| {
        Ok(IdentityRecord { identity: raw.into_identity()?, password_hash })
      })
      .transpose()
  }

  // ── Events ────────────────────────────────────────────────────────────────

  async fn create_event(&self, input: NewEvent) -> Result<EventView> {
    let event = Event {
      event_id:     Uuid::new_v4(),
      title:        input.title,
      description:  input.description,
      location:     input.location,
      date:         input.date,
      capacity:     input.capacity,
      image_path:   input.image_path,
      owner_id:     input.owner_id,
      attendee_ids: vec![],
      created_at:   Utc::now(),
    };

    let id_str      = encode_uuid(event.event_id);
    let title       = event.title.clone();
    let description = event.description.clone();
    let location    = event.location.clone();
    let date_str    = encode_dt(event.date);
    let capacity    = i64::from(event.capacity);
    let image_path  = event.image_path.clone();
    let owner_str   = encode_uuid(event.owner_id);
    let at_str      = encode_dt(event.created_at);

    let owner: Option<RawIdentityRef> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(owner) = query_identity_ref(&tx, &owner_str)? else {
          return Ok(None);
        };
        tx.execute(
          "INSERT INTO events (event_id, title, description, location, date,
                               capacity, image_path, owner_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            title,
            description,
            location,
            date_str,
            capacity,
            image_path,
            owner_str,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(Some(owner))
      })
      .await?;

    let owner = owner.ok_or(Error::Core(
      gather_core::Error::IdentityNotFound(event.owner_id),
    ))?;

    Ok(EventView {
      event,
      owner:     owner.into_ref()?,
      attendees: vec![],
    })
  }

  async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
    let id_str = encode_uuid(id);

    let raw: Option<(RawEvent, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let Some(event) = query_event_row(conn, &id_str)? else {
          return Ok(None);
        };
        let attendees = query_attendee_ids(conn, &id_str)?;
        Ok(Some((event, attendees)))
      })
      .await?;

    raw
      .map(|(event, attendees)| event.into_event(attendees))
      .transpose()
  }

  async fn event_view(&self, id: Uuid) -> Result<Option<EventView>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawEventView> = self
      .conn
      .call(move |conn| query_view(conn, &id_str).map_err(Into::into))
      .await?;

    raw.map(RawEventView::into_view).transpose()
  }

  async fn list_events(&self) -> Result<Vec<EventView>> {
    let raws: Vec<RawEventView> = self
      .conn
      .call(|conn| {
        let ids: Vec<String> = {
          let mut stmt =
            conn.prepare("SELECT event_id FROM events ORDER BY rowid")?;
          stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut views = Vec::with_capacity(ids.len());
        for id in &ids {
          if let Some(view) = query_view(conn, id)? {
            views.push(view);
          }
        }
        Ok(views)
      })
      .await?;

    raws.into_iter().map(RawEventView::into_view).collect()
  }

  async fn events_by_owner(&self, owner_id: Uuid) -> Result<Vec<EventView>> {
    let owner_str = encode_uuid(owner_id);

    let raws: Vec<RawEventView> = self
      .conn
      .call(move |conn| {
        let ids: Vec<String> = {
          let mut stmt = conn.prepare(
            "SELECT event_id FROM events WHERE owner_id = ?1 ORDER BY rowid",
          )?;
          stmt
            .query_map(rusqlite::params![owner_str], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut views = Vec::with_capacity(ids.len());
        for id in &ids {
          if let Some(view) = query_view(conn, id)? {
            views.push(view);
          }
        }
        Ok(views)
      })
      .await?;

    raws.into_iter().map(RawEventView::into_view).collect()
  }

  async fn update_event(&self, id: Uuid, patch: EventPatch) -> Result<EventView> {
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(raw) = query_event_row(&tx, &id_str)? else {
          return Ok(UpdateOutcome::Missing);
        };
        let attendees = query_attendee_ids(&tx, &id_str)?;
        let mut event = raw.into_event(attendees).map_err(db_other)?;

        if let Err(e) = event.apply(patch) {
          return Ok(UpdateOutcome::Rejected(e));
        }

        tx.execute(
          "UPDATE events
           SET title = ?2, description = ?3, location = ?4, date = ?5,
               capacity = ?6, image_path = ?7
           WHERE event_id = ?1",
          rusqlite::params![
            id_str,
            event.title,
            event.description,
            event.location,
            encode_dt(event.date),
            i64::from(event.capacity),
            event.image_path,
          ],
        )?;

        let view = query_view(&tx, &id_str)?;
        tx.commit()?;

        match view {
          Some(view) => Ok(UpdateOutcome::Updated(view)),
          None => Ok(UpdateOutcome::Missing),
        }
      })
      .await?;

    match outcome {
      UpdateOutcome::Missing => {
        Err(Error::Core(gather_core::Error::EventNotFound(id)))
      }
      UpdateOutcome::Rejected(e) => Err(Error::Core(e)),
      UpdateOutcome::Updated(view) => view.into_view(),
    }
  }

  async fn delete_event(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM events WHERE event_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(DeleteOutcome::Missing);
        }

        // The event and its attendee list go as one unit.
        tx.execute(
          "DELETE FROM attendees WHERE event_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM events WHERE event_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(DeleteOutcome::Deleted)
      })
      .await?;

    match outcome {
      DeleteOutcome::Missing => {
        Err(Error::Core(gather_core::Error::EventNotFound(id)))
      }
      DeleteOutcome::Deleted => Ok(()),
    }
  }

  async fn enroll(&self, event_id: Uuid, identity_id: Uuid) -> Result<EventView> {
    let ev_str    = encode_uuid(event_id);
    let actor_str = encode_uuid(identity_id);
    let now_str   = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let capacity: Option<i64> = tx
          .query_row(
            "SELECT capacity FROM events WHERE event_id = ?1",
            rusqlite::params![ev_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(capacity) = capacity else {
          return Ok(EnrollOutcome::Missing);
        };

        // Idempotence check first: a repeat attempt never becomes a
        // capacity failure and never adds a duplicate.
        let already: bool = tx
          .query_row(
            "SELECT 1 FROM attendees WHERE event_id = ?1 AND identity_id = ?2",
            rusqlite::params![ev_str, actor_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if already {
          return Ok(EnrollOutcome::Already);
        }

        let enrolled: i64 = tx.query_row(
          "SELECT COUNT(*) FROM attendees WHERE event_id = ?1",
          rusqlite::params![ev_str],
          |row| row.get(0),
        )?;
        if enrolled >= capacity {
          return Ok(EnrollOutcome::Full(capacity));
        }

        tx.execute(
          "INSERT INTO attendees (event_id, identity_id, enrolled_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![ev_str, actor_str, now_str],
        )?;

        let view = query_view(&tx, &ev_str)?;
        tx.commit()?;

        match view {
          Some(view) => Ok(EnrollOutcome::Enrolled(view)),
          None => Ok(EnrollOutcome::Missing),
        }
      })
      .await?;

    match outcome {
      EnrollOutcome::Missing => {
        Err(Error::Core(gather_core::Error::EventNotFound(event_id)))
      }
      EnrollOutcome::Already => {
        Err(Error::Core(gather_core::Error::AlreadyEnrolled(event_id)))
      }
      EnrollOutcome::Full(capacity) => {
        Err(Error::Core(gather_core::Error::EventFull {
          event_id,
          capacity: decode_capacity(capacity)?,
        }))
      }
      EnrollOutcome::Enrolled(view) => view.into_view(),
    }
  }
}
