use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FetchError, StoreError};
use crate::fetch::{PhotoFetcher, MAX_PHOTOS_PER_BATCH};
use crate::models::{Photo, Pin};

use super::{Database, Records};

/// Client-observable fetch state of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    Idle,
    Fetching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The pin already had this many photos; nothing was fetched
    Cached(usize),
    /// A new batch of this many photos was committed
    Fetched(usize),
}

/// One cell of a pin's photo album.
#[derive(Debug, Clone, PartialEq)]
pub enum AlbumSlot {
    Placeholder,
    Photo(Photo),
}

/// Releases the pin's busy flag when the fetch flow ends, however it ends.
struct BusyGuard<'a> {
    busy: &'a StdMutex<HashSet<Uuid>>,
    pin_id: Uuid,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.pin_id);
    }
}

/// Owner of every pin and photo.
///
/// Construct one per data directory and share it by `Arc`. Fetches on
/// different pins run independently; a second fetch on a pin that is
/// already fetching is rejected with `StoreError::Busy`.
pub struct PinStore {
    db: Database,
    records: Mutex<Records>,
    busy: StdMutex<HashSet<Uuid>>,
    fetcher: PhotoFetcher,
}

impl PinStore {
    pub fn open(data_dir: PathBuf, fetcher: PhotoFetcher) -> Result<Self, StoreError> {
        let db = Database::open(data_dir).map_err(StoreError::PersistenceFailed)?;
        let records = db.load().map_err(StoreError::PersistenceFailed)?;
        info!(
            dir = %db.root().display(),
            pins = records.pins.len(),
            photos = records.photos.len(),
            "Opened pin store"
        );

        Ok(Self {
            db,
            records: Mutex::new(records),
            busy: StdMutex::new(HashSet::new()),
            fetcher,
        })
    }

    // ===== Queries =====

    /// All pins, newest first
    pub async fn pins(&self) -> Vec<Pin> {
        let mut pins = self.records.lock().await.pins.clone();
        pins.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pins
    }

    pub async fn pin(&self, pin_id: Uuid) -> Option<Pin> {
        self.records
            .lock()
            .await
            .pins
            .iter()
            .find(|p| p.id == pin_id)
            .cloned()
    }

    /// Photos of a pin, newest first
    pub async fn photos(&self, pin_id: Uuid) -> Result<Vec<Photo>, StoreError> {
        let records = self.records.lock().await;
        Self::photos_of(&records, pin_id)
    }

    pub fn pin_state(&self, pin_id: Uuid) -> PinState {
        if self.lock_busy().contains(&pin_id) {
            PinState::Fetching
        } else {
            PinState::Idle
        }
    }

    /// Album view of a pin: a full grid of placeholders while a batch is
    /// in flight, otherwise one slot per photo.
    ///
    /// The busy flag is read under the records lock. A batch commits under
    /// that lock and clears its flag afterwards, so an idle pin seen here
    /// never has a commit pending.
    pub async fn album(&self, pin_id: Uuid) -> Result<Vec<AlbumSlot>, StoreError> {
        let records = self.records.lock().await;
        let photos = Self::photos_of(&records, pin_id)?;
        if self.pin_state(pin_id) == PinState::Fetching {
            return Ok(vec![AlbumSlot::Placeholder; MAX_PHOTOS_PER_BATCH]);
        }
        Ok(photos.into_iter().map(AlbumSlot::Photo).collect())
    }

    // ===== Pins =====

    pub async fn add_pin(&self, latitude: f64, longitude: f64) -> Result<Pin, StoreError> {
        if !Pin::is_valid_coordinate(latitude, longitude) {
            return Err(StoreError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        let pin = Pin::new(latitude, longitude);
        let added = pin.clone();
        self.update(|records| {
            records.pins.push(added);
            Ok(())
        })
        .await?;

        info!(pin = %pin.id, latitude, longitude, "Added pin");
        Ok(pin)
    }

    /// Delete a pin and all of its photos. Returns the number of photos
    /// removed. A batch still in flight for the pin is discarded when it
    /// resolves.
    pub async fn delete_pin(&self, pin_id: Uuid) -> Result<usize, StoreError> {
        let removed = self
            .update(|records| {
                let before = records.pins.len();
                records.pins.retain(|p| p.id != pin_id);
                if records.pins.len() == before {
                    return Err(StoreError::PinNotFound(pin_id));
                }
                Ok(Self::remove_photos_of(records, pin_id))
            })
            .await?;

        info!(pin = %pin_id, photos = removed, "Deleted pin");
        Ok(removed)
    }

    // ===== Photos =====

    /// Fetch a batch for the pin unless it already has photos.
    pub async fn ensure_photos(&self, pin_id: Uuid) -> Result<EnsureOutcome, StoreError> {
        let pin = self
            .pin(pin_id)
            .await
            .ok_or(StoreError::PinNotFound(pin_id))?;
        let existing = self.photo_count(pin_id).await;
        if existing > 0 {
            debug!(pin = %pin_id, photos = existing, "Pin already has photos");
            return Ok(EnsureOutcome::Cached(existing));
        }

        let _busy = self.mark_busy(pin_id)?;
        // A batch may have committed between the count and the flag
        let existing = self.photo_count(pin_id).await;
        if existing > 0 {
            return Ok(EnsureOutcome::Cached(existing));
        }

        let fetched = self.fetch_batch(&pin).await?;
        Ok(EnsureOutcome::Fetched(fetched))
    }

    /// Drop the pin's current photos and fetch a fresh batch.
    pub async fn replace_photos(&self, pin_id: Uuid) -> Result<usize, StoreError> {
        let pin = self
            .pin(pin_id)
            .await
            .ok_or(StoreError::PinNotFound(pin_id))?;
        let _busy = self.mark_busy(pin_id)?;

        let removed = self
            .update(|records| Ok(Self::remove_photos_of(records, pin_id)))
            .await?;
        debug!(pin = %pin_id, photos = removed, "Cleared album for new collection");

        self.fetch_batch(&pin).await
    }

    pub async fn delete_photo(&self, photo_id: Uuid) -> Result<(), StoreError> {
        self.update(|records| {
            let index = records
                .photos
                .iter()
                .position(|p| p.id == photo_id)
                .ok_or(StoreError::PhotoNotFound(photo_id))?;

            let pin_id = records.photos[index].pin_id;
            if self.lock_busy().contains(&pin_id) {
                return Err(StoreError::Busy(pin_id));
            }

            records.photos.remove(index);
            Ok(())
        })
        .await?;

        debug!(photo = %photo_id, "Deleted photo");
        Ok(())
    }

    // ===== Internals =====

    /// List, download and commit one batch for `pin`. The caller holds the
    /// pin's busy flag.
    async fn fetch_batch(&self, pin: &Pin) -> Result<usize, StoreError> {
        let result = self.try_fetch_batch(pin).await;
        if let Err(e) = &result {
            warn!(pin = %pin.id, error = %e, "Photo fetch failed");
        }
        result
    }

    async fn try_fetch_batch(&self, pin: &Pin) -> Result<usize, StoreError> {
        let candidates = self
            .fetcher
            .list_candidates(pin.latitude, pin.longitude)
            .await?;
        if candidates.is_empty() {
            return Err(FetchError::NoCandidates.into());
        }

        let images = self.fetcher.download_batch(candidates).await?;

        let created_at = Utc::now();
        let batch: Vec<Photo> = images
            .into_iter()
            .map(|image| Photo::new(pin.id, image, created_at))
            .collect();
        let count = batch.len();

        self.update(|records| {
            if !records.pins.iter().any(|p| p.id == pin.id) {
                return Err(StoreError::PinNotFound(pin.id));
            }
            records.photos.extend(batch);
            Ok(())
        })
        .await?;

        info!(pin = %pin.id, photos = count, "Committed photo batch");
        Ok(count)
    }

    /// Apply `change` to a copy of the records and commit it. The in-memory
    /// state only moves forward once the commit succeeded.
    async fn update<T>(
        &self,
        change: impl FnOnce(&mut Records) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let out = change(&mut next)?;

        self.db
            .commit(&next)
            .map_err(StoreError::PersistenceFailed)?;
        *records = next;
        Ok(out)
    }

    /// Photos of a pin, newest first
    fn photos_of(records: &Records, pin_id: Uuid) -> Result<Vec<Photo>, StoreError> {
        if !records.pins.iter().any(|p| p.id == pin_id) {
            return Err(StoreError::PinNotFound(pin_id));
        }

        let mut photos: Vec<Photo> = records
            .photos
            .iter()
            .filter(|p| p.pin_id == pin_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(photos)
    }

    fn remove_photos_of(records: &mut Records, pin_id: Uuid) -> usize {
        let before = records.photos.len();
        records.photos.retain(|p| p.pin_id != pin_id);
        before - records.photos.len()
    }

    async fn photo_count(&self, pin_id: Uuid) -> usize {
        self.records
            .lock()
            .await
            .photos
            .iter()
            .filter(|p| p.pin_id == pin_id)
            .count()
    }

    fn lock_busy(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_busy(&self, pin_id: Uuid) -> Result<BusyGuard<'_>, StoreError> {
        if !self.lock_busy().insert(pin_id) {
            debug!(pin = %pin_id, "Fetch already in progress");
            return Err(StoreError::Busy(pin_id));
        }
        Ok(BusyGuard {
            busy: &self.busy,
            pin_id,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
