//! Data models for VirtualTourist entities.
//!
//! - `Pin`: a user-placed geographic point of interest
//! - `Photo`: a cached image belonging to exactly one pin
//! - `PhotoRef`: a candidate photo descriptor returned by the search endpoint

pub mod photo;
pub mod pin;

pub use photo::{Photo, PhotoRef, SearchPage, SearchResponse};
pub use pin::{CameraPosition, Pin};
