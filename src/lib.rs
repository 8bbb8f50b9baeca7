//! Local-first store for tracking job applications.
//!
//! An [`ApplicationStore`] holds the ordered list of
//! [`ApplicationRecord`]s in memory and mirrors it to a single key of a
//! [`KeyValueStore`], writing after a short quiet period so bursts of
//! edits produce one write.

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};
mod config;
mod error;
mod flush;
mod record;
mod storage;
mod store;
mod summary;

pub use config::StoreConfig;
pub use error::{ConfigError, StoreError, ValidationError};
pub use record::{ApplicationRecord, JobSource, JobStatus, NewApplication};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{ApplicationStore, ApplicationStoreBuilder, DEFAULT_DEBOUNCE, DEFAULT_KEY};
pub use summary::DashboardSummary;
