//! Scripted `PhotoSource` used by fetcher and store tests.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::api::ApiError;
use crate::models::PhotoRef;

use super::PhotoSource;

/// Encode a small valid PNG whose pixels depend on `shade`
pub(crate) fn test_image(shade: u8) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(2, 2, image::Luma([shade]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("Failed to encode test image");
    buf.into_inner()
}

pub(crate) fn candidates(count: usize) -> Vec<PhotoRef> {
    (0..count)
        .map(|i| PhotoRef {
            id: i.to_string(),
            secret: format!("s{}", i),
            server: "65535".to_string(),
            farm: 66,
        })
        .collect()
}

#[derive(Default)]
pub(crate) struct FakeSource {
    pub candidates: Vec<PhotoRef>,
    pub fail_search: bool,
    /// Candidate ids whose download returns a server error
    pub failing: HashSet<String>,
    /// Candidate ids whose download returns bytes that are not an image
    pub garbage: HashSet<String>,
    /// Candidate ids whose download is a valid image cut short
    pub truncated: HashSet<String>,
    /// When set, every download waits for a permit
    pub gate: Option<Arc<Semaphore>>,
    pub searches: AtomicUsize,
    pub downloads: AtomicUsize,
}

impl FakeSource {
    pub fn with_candidates(count: usize) -> Self {
        Self {
            candidates: candidates(count),
            ..Default::default()
        }
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoSource for FakeSource {
    async fn search(&self, _latitude: f64, _longitude: f64) -> Result<Vec<PhotoRef>, ApiError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(ApiError::ServerError("search unavailable".to_string()));
        }
        Ok(self.candidates.clone())
    }

    async fn download(&self, photo: &PhotoRef) -> Result<Vec<u8>, ApiError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&photo.id) {
            return Err(ApiError::ServerError(format!("photo {} unavailable", photo.id)));
        }
        if self.garbage.contains(&photo.id) {
            return Ok(b"<html>not an image</html>".to_vec());
        }
        let shade = photo.id.parse::<u8>().unwrap_or(1);
        let mut image = test_image(shade);
        if self.truncated.contains(&photo.id) {
            image.truncate(image.len() / 2);
        }
        Ok(image)
    }
}
