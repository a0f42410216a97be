use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Photo, Pin};

/// Index file holding pins and photo metadata
const INDEX_FILE: &str = "store.json";

/// Directory holding one blob file per photo
const PHOTOS_DIR: &str = "photos";

const BLOB_EXTENSION: &str = "img";

/// Everything the store owns, as of the last commit.
#[derive(Debug, Clone, Default)]
pub struct Records {
    pub pins: Vec<Pin>,
    pub photos: Vec<Photo>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PhotoEntry {
    id: Uuid,
    pin_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Index {
    pins: Vec<Pin>,
    photos: Vec<PhotoEntry>,
    saved_at: DateTime<Utc>,
}

/// File-backed persistence for `Records`.
///
/// A commit writes any missing photo blobs, then replaces the index
/// through a temporary file and a rename, then prunes blobs the index no
/// longer references. The index is the source of truth, so a crash between
/// steps leaves at worst some unreferenced blob files.
pub struct Database {
    root: PathBuf,
}

impl Database {
    pub fn open(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(root.join(PHOTOS_DIR))
            .with_context(|| format!("Failed to create data directory: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn blob_path(&self, id: Uuid) -> PathBuf {
        self.root
            .join(PHOTOS_DIR)
            .join(format!("{}.{}", id, BLOB_EXTENSION))
    }

    pub fn load(&self) -> Result<Records> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Records::default());
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read store index")?;
        let index: Index =
            serde_json::from_str(&contents).context("Failed to parse store index")?;

        let mut photos = Vec::with_capacity(index.photos.len());
        for entry in index.photos {
            let blob = self.blob_path(entry.id);
            match std::fs::read(&blob) {
                Ok(image) => photos.push(Photo {
                    id: entry.id,
                    pin_id: entry.pin_id,
                    created_at: entry.created_at,
                    image: image.into(),
                }),
                Err(e) => {
                    // Dropping the entry lets the next ensure_photos refetch
                    warn!(photo = %entry.id, error = %e, "Missing photo blob, skipping");
                }
            }
        }

        debug!(pins = index.pins.len(), photos = photos.len(), "Loaded store");
        Ok(Records {
            pins: index.pins,
            photos,
        })
    }

    pub fn commit(&self, records: &Records) -> Result<()> {
        for photo in &records.photos {
            let blob = self.blob_path(photo.id);
            if !blob.exists() {
                std::fs::write(&blob, &photo.image)
                    .with_context(|| format!("Failed to write photo {}", photo.id))?;
            }
        }

        let index = Index {
            pins: records.pins.clone(),
            photos: records
                .photos
                .iter()
                .map(|p| PhotoEntry {
                    id: p.id,
                    pin_id: p.pin_id,
                    created_at: p.created_at,
                })
                .collect(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&index)?;
        let tmp = self.root.join(format!("{}.tmp", INDEX_FILE));
        std::fs::write(&tmp, contents).context("Failed to write store index")?;
        std::fs::rename(&tmp, self.index_path()).context("Failed to replace store index")?;

        self.prune_blobs(records);
        Ok(())
    }

    /// Remove blob files not referenced by `records`. Failures only leave
    /// garbage behind, so they are logged and ignored.
    fn prune_blobs(&self, records: &Records) {
        let live: HashSet<Uuid> = records.photos.iter().map(|p| p.id).collect();
        let entries = match std::fs::read_dir(self.root.join(PHOTOS_DIR)) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, "Failed to list photo blobs");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok());
            if let Some(id) = id {
                if !live.contains(&id) {
                    if let Err(e) = std::fs::remove_file(&path) {
                        debug!(path = %path.display(), error = %e, "Failed to prune photo blob");
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
