//! SQLite backend for the Gather event store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. A side effect of the single
//! connection is that every transaction is serialised, which is exactly
//! what the enrollment primitive needs.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
