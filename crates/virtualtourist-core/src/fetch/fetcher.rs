use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::error::FetchError;
use crate::models::PhotoRef;

use super::{PhotoSource, PLACEHOLDER_IMAGE};

/// Upper bound on the number of photos downloaded for one pin
pub const MAX_PHOTOS_PER_BATCH: usize = 12;

/// Uniformly shuffle `candidates` and keep the first `limit`.
pub fn sample<R: Rng + ?Sized>(
    mut candidates: Vec<PhotoRef>,
    limit: usize,
    rng: &mut R,
) -> Vec<PhotoRef> {
    candidates.shuffle(rng);
    candidates.truncate(limit);
    candidates
}

/// Stateless fetcher. Clone is cheap, the source is shared.
#[derive(Clone)]
pub struct PhotoFetcher {
    source: Arc<dyn PhotoSource>,
}

impl PhotoFetcher {
    pub fn new(source: Arc<dyn PhotoSource>) -> Self {
        Self { source }
    }

    /// Fetch the candidate list for a coordinate
    pub async fn list_candidates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<PhotoRef>, FetchError> {
        self.source
            .search(latitude, longitude)
            .await
            .map_err(FetchError::ListFailed)
    }

    /// Download a random sample of `candidates`, one task per photo.
    ///
    /// Resolves once every download has finished. A failed or undecodable
    /// download yields the placeholder image in its slot, so the result
    /// always holds `min(candidates.len(), MAX_PHOTOS_PER_BATCH)` images in
    /// no particular order.
    pub async fn download_batch(
        &self,
        candidates: Vec<PhotoRef>,
    ) -> Result<Vec<Vec<u8>>, FetchError> {
        let selected = sample(candidates, MAX_PHOTOS_PER_BATCH, &mut rand::thread_rng());
        debug!(count = selected.len(), "Downloading photo batch");

        let tasks: Vec<_> = selected
            .into_iter()
            .map(|photo| {
                let source = Arc::clone(&self.source);
                tokio::spawn(async move { Self::download_one(source.as_ref(), &photo).await })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;

        let mut failed = 0;
        let images = results
            .into_iter()
            .map(|result| match result {
                Ok(Ok(image)) => image,
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(error = %e, "Using placeholder for failed download");
                    PLACEHOLDER_IMAGE.to_vec()
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "Download task did not complete, using placeholder");
                    PLACEHOLDER_IMAGE.to_vec()
                }
            })
            .collect::<Vec<_>>();

        debug!(count = images.len(), failed, "Photo batch resolved");
        Ok(images)
    }

    async fn download_one(source: &dyn PhotoSource, photo: &PhotoRef) -> Result<Vec<u8>, FetchError> {
        let failed = |err| FetchError::DownloadFailed {
            id: photo.id.clone(),
            source: err,
        };

        let bytes = source.download(photo).await.map_err(failed)?;
        // Full decode is CPU bound, keep it off the async workers
        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes).map(|_| bytes))
            .await
            .map_err(|e| failed(ApiError::UndecodableImage(e.to_string())))?
            .map_err(|e| failed(ApiError::UndecodableImage(e.to_string())))
    }
}
