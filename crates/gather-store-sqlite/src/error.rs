//! Error type for `gather-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] gather_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

/// Collapse into the domain taxonomy: domain conditions pass through,
/// anything infrastructural becomes a backend fault.
impl From<Error> for gather_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => gather_core::Error::Backend(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
