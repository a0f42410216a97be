//! VirtualTourist core: drop pins on a map and cache a random album of
//! nearby Flickr photos for each.
//!
//! - `api`: Flickr REST client
//! - `fetch`: candidate listing, random sampling and concurrent download
//! - `store`: pins and photos on disk, fetch-and-cache flows
//! - `map`: map display adapter
//! - `config`: user configuration

pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod map;
pub mod models;
pub mod store;

pub use api::{ApiError, FlickrClient};
pub use config::Config;
pub use error::{FetchError, StoreError};
pub use fetch::{PhotoFetcher, PhotoSource};
pub use models::{CameraPosition, Photo, PhotoRef, Pin};
pub use store::{AlbumSlot, EnsureOutcome, PinState, PinStore};
