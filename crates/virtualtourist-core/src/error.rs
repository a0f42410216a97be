use thiserror::Error;
use uuid::Uuid;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to list photos: {0}")]
    ListFailed(#[source] ApiError),

    /// Per-item failure. Absorbed inside a batch and replaced by the
    /// placeholder, never returned from `download_batch`.
    #[error("Failed to download photo {id}: {source}")]
    DownloadFailed {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("No photos found at this location")]
    NoCandidates,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Pin not found: {0}")]
    PinNotFound(Uuid),

    #[error("Photo not found: {0}")]
    PhotoNotFound(Uuid),

    #[error("Photos are already being fetched for pin {0}")]
    Busy(Uuid),

    #[error("Invalid coordinate: {latitude}, {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to save changes: {0:#}")]
    PersistenceFailed(anyhow::Error),
}
