//! Local persistence of pins and their photo albums.
//!
//! This module provides the `PinStore`, which owns every pin and photo and
//! drives the fetch-and-cache flow, and the file-backed `Database` it
//! commits to. Writes are "last write wins"; a photo batch is committed
//! only after all of its downloads resolved.

pub mod database;
pub mod pin_store;

pub use database::{Database, Records};
pub use pin_store::{AlbumSlot, EnsureOutcome, PinState, PinStore};
