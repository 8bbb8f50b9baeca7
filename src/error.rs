//! Crate-level error types for record creation, storage and configuration.

/// Error returned when [`create`](crate::ApplicationStore::create) rejects
/// its input.
///
/// No record is appended when this is returned; the presentation layer is
/// expected to block the submit and prompt the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `jobTitle` was empty or whitespace.
    #[error("job title is required")]
    MissingJobTitle,

    /// `companyName` was empty or whitespace.
    #[error("company name is required")]
    MissingCompanyName,

    /// `applicationDate` was not supplied.
    #[error("application date is required")]
    MissingApplicationDate,
}

/// Error returned when the host storage or the background flusher fails.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Host storage I/O failure.
    ///
    /// Reading the persistent key during load, or writing it during an
    /// explicit flush, failed at the storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The collection could not be serialized.
    #[error("failed to serialize applications: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Flusher task exited unexpectedly.
    ///
    /// The background task that owns pending writes has shut down, so no
    /// further explicit flushes can be acknowledged.
    #[error("flusher task is no longer running")]
    FlusherGone,
}

/// A persisted document that cannot be adopted as the collection.
///
/// Never leaves the crate: `load` recovers from it by resetting the key.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CorruptState {
    /// The document is not JSON, or its elements are not record-shaped.
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document is valid JSON but its top-level value is not an array.
    #[error("top-level value is not an array")]
    NotArray,
}

/// Error returned when [`StoreConfig::from_env`](crate::StoreConfig::from_env)
/// finds an unusable value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Parser message.
        reason: String,
    },

    /// The configured key name is empty.
    #[error("storage key must not be empty")]
    EmptyKey,
}
