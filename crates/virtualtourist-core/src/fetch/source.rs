use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::PhotoRef;

/// Remote side of a fetch: a search endpoint and an image host.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Candidate photos taken near a coordinate, in provider order
    async fn search(&self, latitude: f64, longitude: f64) -> Result<Vec<PhotoRef>, ApiError>;

    /// Raw body of one candidate image
    async fn download(&self, photo: &PhotoRef) -> Result<Vec<u8>, ApiError>;
}
