use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cached image. Immutable once created; `pin_id` is a back-reference,
/// the pin owns its photos. Clone is cheap, the image bytes are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: Uuid,
    pub pin_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub image: Arc<[u8]>,
}

impl Photo {
    pub fn new(pin_id: Uuid, image: impl Into<Arc<[u8]>>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pin_id,
            created_at,
            image: image.into(),
        }
    }

    /// File extension matching the image format, `img` when unknown
    pub fn file_extension(&self) -> &'static str {
        image::guess_format(&self.image)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("img")
    }

    pub fn size_display(&self) -> String {
        let bytes = self.image.len();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KiB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

/// Candidate photo descriptor from `flickr.photos.search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub id: String,
    pub secret: String,
    pub server: String,
    pub farm: i64,
}

/// Envelope of a search response: `{"photos": {"photo": [...]}, "stat": "ok"}`
/// or `{"stat": "fail", "code": 100, "message": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub stat: Option<String>,
    pub photos: Option<SearchPage>,
    pub code: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub photo: Vec<PhotoRef>,
}
