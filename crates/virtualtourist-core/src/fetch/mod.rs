//! Photo fetching for a coordinate.
//!
//! `PhotoFetcher` resolves the candidate list for a location, samples at
//! most `MAX_PHOTOS_PER_BATCH` of them uniformly at random and downloads
//! the sample concurrently. Individual download failures are replaced by
//! the bundled placeholder image; only the list step can fail.

pub mod fetcher;
pub mod placeholder;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{sample, PhotoFetcher, MAX_PHOTOS_PER_BATCH};
pub use placeholder::{is_placeholder, PLACEHOLDER_IMAGE};
pub use source::PhotoSource;
