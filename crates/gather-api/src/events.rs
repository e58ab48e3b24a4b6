//! Handlers for `/api/events` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/api/events/create` | Multipart; bearer token |
//! | `GET`    | `/api/events/all` | Open |
//! | `GET`    | `/api/events/my-events` | Bearer token; owner scope |
//! | `GET`    | `/api/events/:id` | Open; 404 if not found |
//! | `PUT`    | `/api/events/:id` | Multipart; owner only |
//! | `DELETE` | `/api/events/:id` | Owner only |
//! | `POST`   | `/api/events/:id/rsvp` | Bearer token; the enrollment primitive |
//!
//! Create and update take `multipart/form-data` (field names `title`,
//! `description`, `date`, `location`, `maxAttendees`, optional `image`
//! file part), matching the upload forms the frontend submits.

use axum::{
  Json,
  extract::{Multipart, Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use gather_core::{
  authz::authorize_owner,
  event::{EventPatch, EventView, NewEvent},
  store::Store,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, auth::AuthIdentity, error::ApiError, upload::ImageStore};

// ─── Response bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct OwnerBody {
  pub id:       Uuid,
  pub username: String,
  pub email:    String,
}

#[derive(Debug, Serialize)]
pub struct AttendeeBody {
  pub id:       Uuid,
  pub username: String,
}

/// The wire representation of an event, owner and attendees summarised.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
  pub id:            Uuid,
  pub title:         String,
  pub description:   String,
  pub location:      String,
  pub date:          DateTime<Utc>,
  pub max_attendees: u32,
  pub image_url:     Option<String>,
  pub created_by:    OwnerBody,
  pub attendees:     Vec<AttendeeBody>,
  pub created_at:    DateTime<Utc>,
}

impl From<EventView> for EventBody {
  fn from(view: EventView) -> Self {
    EventBody {
      id:            view.event.event_id,
      title:         view.event.title,
      description:   view.event.description,
      location:      view.event.location,
      date:          view.event.date,
      max_attendees: view.event.capacity,
      image_url:     view.event.image_path,
      created_by:    OwnerBody {
        id:       view.owner.identity_id,
        username: view.owner.username,
        email:    view.owner.email,
      },
      attendees:     view
        .attendees
        .into_iter()
        .map(|a| AttendeeBody { id: a.identity_id, username: a.username })
        .collect(),
      created_at:    view.event.created_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct RsvpBody {
  pub message: String,
  pub event:   EventBody,
}

#[derive(Debug, Serialize)]
pub struct DeletedBody {
  pub message: String,
}

// ─── Multipart form ──────────────────────────────────────────────────────────

/// The fields of an event form, each present or absent. Presence is what
/// distinguishes "set to this value" from "leave unchanged" on update.
#[derive(Default)]
struct EventForm {
  title:         Option<String>,
  description:   Option<String>,
  location:      Option<String>,
  date:          Option<String>,
  max_attendees: Option<String>,
  image:         Option<(String, Bytes)>,
}

async fn read_form(mut multipart: Multipart) -> Result<EventForm, ApiError> {
  let mut form = EventForm::default();

  while let Some(field) = multipart.next_field().await.map_err(|e| {
    ApiError::Validation(format!("malformed multipart body: {e}"))
  })? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some("title") => form.title = Some(text(field).await?),
      Some("description") => form.description = Some(text(field).await?),
      Some("location") => form.location = Some(text(field).await?),
      Some("date") => form.date = Some(text(field).await?),
      Some("maxAttendees") => form.max_attendees = Some(text(field).await?),
      Some("image") => {
        let file_name = field.file_name().unwrap_or("image").to_owned();
        let bytes = field.bytes().await.map_err(|e| {
          ApiError::Validation(format!("malformed multipart body: {e}"))
        })?;
        // A file input left empty submits a zero-length part; that is
        // "no image", not an image.
        if !bytes.is_empty() {
          form.image = Some((file_name, bytes));
        }
      }
      _ => {}
    }
  }

  Ok(form)
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
  field
    .text()
    .await
    .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))
}

/// Accept RFC 3339, the `datetime-local` input format, or a bare date.
fn parse_date(s: &str) -> Result<DateTime<Utc>, ApiError> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
    return Ok(Utc.from_utc_datetime(&naive));
  }
  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
    && let Some(naive) = date.and_hms_opt(0, 0, 0)
  {
    return Ok(Utc.from_utc_datetime(&naive));
  }
  Err(ApiError::Validation(format!("cannot parse date: {s:?}")))
}

fn parse_capacity(s: &str) -> Result<u32, ApiError> {
  s.trim()
    .parse::<u32>()
    .ok()
    .filter(|c| *c > 0)
    .ok_or_else(|| {
      ApiError::Validation(format!(
        "maxAttendees must be a positive integer, got {s:?}"
      ))
    })
}

async fn save_image(
  images: &ImageStore,
  image: Option<(String, Bytes)>,
) -> Result<Option<String>, ApiError> {
  match image {
    Some((name, bytes)) => Ok(Some(images.save(&name, bytes).await?)),
    None => Ok(None),
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /api/events/create`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthIdentity(actor): AuthIdentity,
  multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let form = read_form(multipart).await?;

  let (Some(title), Some(description), Some(location), Some(date), Some(capacity)) = (
    form.title.filter(|s| !s.is_empty()),
    form.description.filter(|s| !s.is_empty()),
    form.location.filter(|s| !s.is_empty()),
    form.date.filter(|s| !s.is_empty()),
    form.max_attendees.filter(|s| !s.is_empty()),
  ) else {
    return Err(ApiError::Validation(
      "please provide all required fields".into(),
    ));
  };

  let date = parse_date(&date)?;
  let capacity = parse_capacity(&capacity)?;
  let image_path = save_image(&state.images, form.image).await?;

  let view = state
    .store
    .create_event(NewEvent {
      title,
      description,
      location,
      date,
      capacity,
      image_path,
      owner_id: actor.identity_id,
    })
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(EventBody::from(view))))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /api/events/all` — open to anonymous callers.
pub async fn list_all<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<EventBody>>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let views = state.store.list_events().await.map_err(ApiError::store)?;
  Ok(Json(views.into_iter().map(EventBody::from).collect()))
}

/// `GET /api/events/my-events` — events owned by the bearer.
pub async fn my_events<S>(
  State(state): State<AppState<S>>,
  AuthIdentity(actor): AuthIdentity,
) -> Result<Json<Vec<EventBody>>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let views = state
    .store
    .events_by_owner(actor.identity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(views.into_iter().map(EventBody::from).collect()))
}

/// `GET /api/events/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<EventBody>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let view = state
    .store
    .event_view(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  Ok(Json(EventBody::from(view)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /api/events/:id` — owner only; any subset of fields.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  AuthIdentity(actor): AuthIdentity,
  multipart: Multipart,
) -> Result<Json<EventBody>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  // Load before gating: a missing event is 404 even for a non-owner.
  let event = state
    .store
    .get_event(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  authorize_owner(&event, actor.identity_id).map_err(ApiError::store)?;

  let form = read_form(multipart).await?;

  let date = form.date.as_deref().map(parse_date).transpose()?;
  let capacity = form.max_attendees.as_deref().map(parse_capacity).transpose()?;
  let image_path = save_image(&state.images, form.image).await?;

  let patch = EventPatch {
    title: form.title,
    description: form.description,
    location: form.location,
    date,
    capacity,
    image_path,
  };

  let view = state
    .store
    .update_event(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(EventBody::from(view)))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /api/events/:id` — owner only; event and attendee list go
/// together, no notification to attendees.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  AuthIdentity(actor): AuthIdentity,
) -> Result<Json<DeletedBody>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let event = state
    .store
    .get_event(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  authorize_owner(&event, actor.identity_id).map_err(ApiError::store)?;

  state.store.delete_event(id).await.map_err(ApiError::store)?;
  Ok(Json(DeletedBody { message: "Event deleted successfully".into() }))
}

// ─── RSVP ────────────────────────────────────────────────────────────────────

/// `POST /api/events/:id/rsvp` — the enrollment primitive. Any
/// authenticated identity, including the owner, may attempt it; the store
/// serialises the capacity check and the append per event.
pub async fn rsvp<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  AuthIdentity(actor): AuthIdentity,
) -> Result<Json<RsvpBody>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let view = state
    .store
    .enroll(id, actor.identity_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(RsvpBody {
    message: "RSVP successful".into(),
    event:   EventBody::from(view),
  }))
}
