//! Core types and trait definitions for the Gather event service.
//!
//! Domain model only: no HTTP, no database. Every other crate in the
//! workspace depends on this one and implements or consumes its traits.

// Native `async fn` in traits, with explicit `Send` bounds spelled out via
// `impl Future` in the `Store` trait. Suppress the advisory lint.
#![allow(async_fn_in_trait)]

pub mod authz;
pub mod error;
pub mod event;
pub mod identity;
pub mod store;

pub use error::{Error, Result};
