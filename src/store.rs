//! Top-level entry point that owns the application collection and keeps
//! the persistent key in sync with it.
//!
//! The store is opened via [`ApplicationStoreBuilder`], which hydrates the
//! collection from the key (recovering from corrupt documents) and spawns
//! the background flusher that performs debounced writes.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::clock::{Clock, SystemClock};
use crate::error::{CorruptState, StoreError, ValidationError};
use crate::flush::{Flusher, write_snapshot};
use crate::record::{ApplicationRecord, NewApplication, Snapshot, StoredElement};
use crate::storage::KeyValueStore;
use crate::summary::DashboardSummary;

/// Key the browser build of the tracker uses in local storage.
pub const DEFAULT_KEY: &str = "jobApplications";

/// Default quiet period before a mutation is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Authoritative, ordered collection of [`ApplicationRecord`]s.
///
/// Mutating operations take `&mut self`: there is exactly one logical
/// owner, so id generation and ordering need no locking. Every mutation
/// hands a snapshot to the flusher, which writes the key once the
/// debounce window passes without further changes.
///
/// Mutations must run inside a tokio runtime, since the flusher is a
/// tokio task. Call [`shutdown`](ApplicationStore::shutdown) before the
/// runtime exits: a store dropped at the end of `#[tokio::main]` can lose
/// its pending write, because the runtime may stop the flusher before it
/// sees the store go away.
pub struct ApplicationStore {
    records: Vec<ApplicationRecord>,
    /// Stored elements that do not read as records, written back as-is.
    raw: Arc<[serde_json::Value]>,
    key: String,
    clock: Arc<dyn Clock>,
    flusher: Flusher,
    /// Millisecond value of the last id handed out.
    last_issued: Option<i64>,
}

// Manual `Debug` because the trait objects are not `Debug`.
impl std::fmt::Debug for ApplicationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationStore")
            .field("key", &self.key)
            .field("len", &self.records.len())
            .finish()
    }
}

impl ApplicationStore {
    /// Start configuring a store backed by `storage`.
    pub fn builder(storage: impl KeyValueStore) -> ApplicationStoreBuilder {
        ApplicationStoreBuilder::new(storage)
    }

    /// The collection in insertion order.
    pub fn list(&self) -> &[ApplicationRecord] {
        &self.records
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Option<&ApplicationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Number of records in the collection.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The persistent key this store owns.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Validate `input`, append it as a new record, and schedule a flush.
    ///
    /// # Returns
    ///
    /// The stored record, including its assigned `id` and `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the title, company or application
    /// date is missing. The collection is left untouched.
    pub fn create(&mut self, input: NewApplication) -> Result<&ApplicationRecord, ValidationError> {
        let application_date = input.validate()?;

        let id = self.next_id();
        let created_at = self.clock.now();
        let record = ApplicationRecord::from_input(input, application_date, id, created_at);
        tracing::debug!(id = %record.id, company = %record.company_name, "application created");

        let index = self.records.len();
        self.records.push(record);
        self.schedule_flush();
        Ok(&self.records[index])
    }

    /// Remove the record with `id`, keeping the order of the rest.
    ///
    /// An unknown id is a no-op. A flush is scheduled either way.
    ///
    /// # Returns
    ///
    /// `true` if a record was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let removed = match self.records.iter().position(|r| r.id == id) {
            Some(index) => {
                self.records.remove(index);
                true
            }
            None => false,
        };
        tracing::debug!(id, removed, "application delete");
        self.schedule_flush();
        removed
    }

    /// Mark the follow-up of `id` as done or not done.
    ///
    /// # Returns
    ///
    /// `true` if a record matched; a flush is scheduled only then.
    pub fn set_follow_up_completed(&mut self, id: &str, completed: bool) -> bool {
        self.update(id, |record| record.follow_up_completed = completed)
    }

    /// Set or clear the follow-up date of `id`.
    ///
    /// # Returns
    ///
    /// `true` if a record matched; a flush is scheduled only then.
    pub fn set_follow_up_date(&mut self, id: &str, date: Option<NaiveDate>) -> bool {
        self.update(id, |record| record.follow_up_date = date)
    }

    /// Dashboard statistics as of the clock's current day.
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::compute(&self.records, self.clock.now().date_naive())
    }

    /// Write the collection now, cancelling any pending debounced write.
    ///
    /// # Errors
    ///
    /// * [`StoreError::Io`] -- the backend rejected the write.
    /// * [`StoreError::FlusherGone`] -- the flusher task has exited.
    pub async fn flush_now(&self) -> Result<(), StoreError> {
        self.flusher.flush_now(self.snapshot()).await
    }

    /// Write any pending change and stop the flusher.
    ///
    /// Call this before the tokio runtime exits. Dropping the store only
    /// closes the flusher's channel; the pending change is written if the
    /// runtime still polls the flusher afterwards, which is not the case
    /// once `#[tokio::main]` returns. `shutdown` waits for the write and
    /// reports failures.
    ///
    /// # Errors
    ///
    /// Same as [`flush_now`](ApplicationStore::flush_now).
    pub async fn shutdown(self) -> Result<(), StoreError> {
        self.flusher.shutdown().await
    }

    fn update(&mut self, id: &str, change: impl FnOnce(&mut ApplicationRecord)) -> bool {
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        change(record);
        self.schedule_flush();
        true
    }

    fn schedule_flush(&self) {
        self.flusher.schedule(self.snapshot());
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.records.clone(),
            raw: Arc::clone(&self.raw),
        }
    }

    fn id_taken(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
            || self
                .raw
                .iter()
                .any(|value| value.get("id").and_then(|v| v.as_str()) == Some(id))
    }

    /// Millisecond timestamp from the clock, bumped past the last issued
    /// id and any id already present in the stored document.
    fn next_id(&mut self) -> String {
        let now_ms = self.clock.now().timestamp_millis();
        let mut candidate = match self.last_issued {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };
        while self.id_taken(&candidate.to_string()) {
            candidate += 1;
        }
        self.last_issued = Some(candidate);
        candidate.to_string()
    }
}

/// Builder for configuring and opening an [`ApplicationStore`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use jobtrack::{ApplicationStore, FileStore};
///
/// # async fn example() -> Result<(), jobtrack::StoreError> {
/// let store = ApplicationStore::builder(FileStore::new("./data"))
///     .key("jobApplications")
///     .debounce(Duration::from_millis(100))
///     .load()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ApplicationStoreBuilder {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
    debounce: Duration,
}

impl ApplicationStoreBuilder {
    /// Create a builder with the default key, debounce and system clock.
    pub fn new(storage: impl KeyValueStore) -> Self {
        Self {
            storage: Arc::new(storage),
            clock: Arc::new(SystemClock),
            key: DEFAULT_KEY.to_owned(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Set the persistent key holding the collection.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the quiet period before a mutation is written.
    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    /// Set the time source for ids and creation timestamps.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Hydrate the collection from the persistent key and start the
    /// flusher.
    ///
    /// - Absent key: empty collection, nothing written.
    /// - A JSON array: adopted as-is, nothing written. Elements are
    ///   trusted; any that do not read as records are kept as raw JSON and
    ///   written back after the records on the next flush.
    /// - Non-JSON, or JSON whose top-level value is not an array: logged,
    ///   the key is reset to `[]`, and the store starts empty. The
    ///   discarded payload is not kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the backend fails to read the key or
    /// to write the reset document.
    pub async fn load(self) -> Result<ApplicationStore, StoreError> {
        let (records, raw) = hydrate(self.storage.as_ref(), &self.key)?;
        tracing::info!(key = %self.key, count = records.len(), "applications loaded");
        if !raw.is_empty() {
            tracing::warn!(
                key = %self.key,
                count = raw.len(),
                "stored applications contain unreadable entries; keeping them as-is"
            );
        }

        let flusher = Flusher::spawn(self.storage, self.key.clone(), self.debounce);
        Ok(ApplicationStore {
            records,
            raw: Arc::from(raw),
            key: self.key,
            clock: self.clock,
            flusher,
            last_issued: None,
        })
    }
}

/// Readable records and unreadable raw elements, each in stored order.
type Hydrated = (Vec<ApplicationRecord>, Vec<serde_json::Value>);

fn hydrate(storage: &dyn KeyValueStore, key: &str) -> Result<Hydrated, StoreError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(Hydrated::default());
    };

    match parse_document(&raw) {
        Ok(elements) => Ok(split_elements(elements)),
        Err(e) => {
            tracing::warn!(
                key,
                error = %e,
                "stored applications are corrupt; resetting to an empty list"
            );
            write_snapshot(storage, key, &Snapshot::default())?;
            Ok(Hydrated::default())
        }
    }
}

/// Only the top-level shape is checked. Once the document is an array,
/// every element is accepted, as a record or as raw JSON.
fn parse_document(raw: &str) -> Result<Vec<StoredElement>, CorruptState> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !value.is_array() {
        return Err(CorruptState::NotArray);
    }
    Ok(serde_json::from_value(value)?)
}

fn split_elements(elements: Vec<StoredElement>) -> Hydrated {
    let mut hydrated = Hydrated::default();
    for element in elements {
        match element {
            StoredElement::Record(record) => hydrated.0.push(record),
            StoredElement::Raw(value) => hydrated.1.push(value),
        }
    }
    hydrated
}
