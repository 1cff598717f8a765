//! Record repository for patient locations.
//!
//! The repository owns the canonical list of [`PatientLocation`]s. Readers
//! get immutable snapshots; every mutation builds a complete new list, writes
//! it to the [`RecordStore`] and only then publishes it. Mutations are
//! serialized so identifier assignment always sees the latest list.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::codec::{self, SkippedLine};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::location::{LocationId, PatientLocation};
use crate::store::{FileStore, RecordStore, Seed};

/// Immutable copy of the full record list at one point in time.
pub type Snapshot = Arc<[PatientLocation]>;

/// Repository holding the patient-location list.
///
/// Share it behind an `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct PatientRepository {
    /// Durable storage for the encoded list.
    store: Arc<dyn RecordStore>,
    /// First-run data, used when the store is empty.
    seed: Seed,
    /// Writer lock. The flag records whether the list has been loaded.
    writer: Mutex<bool>,
    /// Latest published snapshot.
    state: watch::Sender<Snapshot>,
}

impl PatientRepository {
    /// Create a repository over `store`, seeding from `seed` on first run.
    ///
    /// The published list starts empty until [`initialize`](Self::initialize)
    /// or the first mutation loads it.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, seed: Seed) -> Self {
        let (state, _) = watch::channel(Snapshot::from(Vec::new()));
        Self {
            store,
            seed,
            writer: Mutex::new(false),
            state,
        }
    }

    /// Create a file-backed repository from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(FileStore::new(config.store_path())), config.seed())
    }

    /// Load the list from the store, seeding the store first if it is empty.
    ///
    /// Records are published in on-disk order. Calling this again reloads
    /// whatever the store currently holds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read or the seed cannot
    /// be written to it, and [`Error::SeedUnavailable`] if the seed file
    /// cannot be read. The published list is left unchanged on error.
    pub async fn initialize(&self) -> Result<Snapshot> {
        let mut loaded = self.writer.lock().await;
        let snapshot = self.load().await?;
        *loaded = true;
        Ok(snapshot)
    }

    /// Insert a new record or replace an existing one.
    ///
    /// A record whose id is already in the list replaces that entry. Any
    /// other id, including the unassigned id `0`, creates a new entry with
    /// id `max + 1`. Returns the record as stored.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the new list cannot be written. The
    /// published list is left unchanged in that case.
    pub async fn upsert(&self, location: PatientLocation) -> Result<PatientLocation> {
        let mut loaded = self.writer.lock().await;
        self.ensure_loaded(&mut loaded).await?;

        let mut next = self.list().to_vec();
        let stored = place(&mut next, location, false)?;
        self.commit(next).await?;

        debug!(id = stored.id, "Upserted patient location");
        Ok(stored)
    }

    /// Delete the record with `id`, returning it.
    ///
    /// Removing an id that is not in the list returns `None` without writing
    /// the store. Nothing is published, so subscribers are not notified.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the new list cannot be written. The
    /// published list is left unchanged in that case.
    pub async fn remove(&self, id: LocationId) -> Result<Option<PatientLocation>> {
        let mut loaded = self.writer.lock().await;
        self.ensure_loaded(&mut loaded).await?;

        let current = self.list();
        let Some(removed) = current.iter().find(|entry| entry.id == id).cloned() else {
            debug!(id, "Remove skipped, no such patient location");
            return Ok(None);
        };

        let next = current
            .iter()
            .filter(|entry| entry.id != id)
            .cloned()
            .collect();
        self.commit(next).await?;

        debug!(id, "Removed patient location");
        Ok(Some(removed))
    }

    /// Put back a record returned by [`remove`](Self::remove).
    ///
    /// The record keeps its original id when that id is free. Otherwise this
    /// behaves like [`upsert`](Self::upsert).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the new list cannot be written.
    pub async fn restore(&self, location: PatientLocation) -> Result<PatientLocation> {
        let mut loaded = self.writer.lock().await;
        self.ensure_loaded(&mut loaded).await?;

        let mut next = self.list().to_vec();
        let stored = place(&mut next, location, true)?;
        self.commit(next).await?;

        debug!(id = stored.id, "Restored patient location");
        Ok(stored)
    }

    /// Latest published list.
    #[must_use]
    pub fn list(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Look up one record in the latest published list.
    #[must_use]
    pub fn get(&self, id: LocationId) -> Option<PatientLocation> {
        self.state.borrow().iter().find(|entry| entry.id == id).cloned()
    }

    /// Register an observer for every list published from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.state.subscribe(),
        }
    }

    async fn ensure_loaded(&self, loaded: &mut bool) -> Result<()> {
        if !*loaded {
            self.load().await?;
            *loaded = true;
        }
        Ok(())
    }

    /// Read (or seed) the store and publish its contents. Caller holds the writer lock.
    async fn load(&self) -> Result<Snapshot> {
        let location = self.store.describe();
        let (text, source) = match self.store.read().await? {
            Some(text) => (text, "store"),
            None => {
                let text = self.seed.read().await?;
                self.store.write(&text).await?;
                info!("Seeded record store at {}", location);
                (text, "seed")
            }
        };

        let report = codec::decode_report(&text);
        log_skipped(&location, &report.skipped);
        info!(
            count = report.records.len(),
            skipped = report.skipped.len(),
            source,
            "Loaded patient locations from {}",
            location
        );

        Ok(self.publish(report.records))
    }

    /// Persist `next` sorted by id, then publish it. Caller holds the writer lock.
    async fn commit(&self, mut next: Vec<PatientLocation>) -> Result<Snapshot> {
        next.sort_by_key(|entry| entry.id);
        self.store.write(&codec::encode(&next)).await?;
        Ok(self.publish(next))
    }

    fn publish(&self, records: Vec<PatientLocation>) -> Snapshot {
        let snapshot = Snapshot::from(records);
        self.state.send_replace(Arc::clone(&snapshot));
        snapshot
    }
}

/// Receiving side of the repository's published lists.
///
/// Intermediate lists are coalesced: an observer that falls behind sees the
/// latest list, never a stale one.
#[derive(Debug, Clone)]
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    /// List published most recently.
    #[must_use]
    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// Whether a list was published since this handle last looked.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next published list.
    ///
    /// Returns `None` once the repository has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Insert or replace `location` in `list`, returning the stored record.
///
/// With `keep_free_id`, a non-zero id that is not in the list is kept
/// instead of being replaced by a fresh one.
fn place(
    list: &mut Vec<PatientLocation>,
    location: PatientLocation,
    keep_free_id: bool,
) -> Result<PatientLocation> {
    if let Some(index) = list.iter().position(|entry| entry.id == location.id) {
        list[index] = location.clone();
        return Ok(location);
    }

    let stored = if keep_free_id && !location.is_unassigned() {
        location
    } else {
        location.with_id(next_id(list)?)
    };
    list.push(stored.clone());
    Ok(stored)
}

fn next_id(list: &[PatientLocation]) -> Result<LocationId> {
    list.iter()
        .map(|entry| entry.id)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| Error::internal("patient location ids exhausted"))
}

fn log_skipped(location: &str, skipped: &[SkippedLine]) {
    for line in skipped {
        warn!(
            line = line.line,
            "Skipped malformed record in {}: {}", location, line.reason
        );
    }
}
