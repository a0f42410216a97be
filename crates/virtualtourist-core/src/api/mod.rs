//! REST API client module for Flickr.
//!
//! This module provides the `FlickrClient` for searching photos taken
//! near a coordinate and downloading their image bodies.
//!
//! The search endpoint is keyed by a static API key; no other
//! authentication is involved.

pub mod client;
pub mod error;

pub use client::{FlickrClient, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::ApiError;
