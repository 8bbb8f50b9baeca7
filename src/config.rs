//! Store configuration with environment overrides.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, StoreError};
use crate::storage::FileStore;
use crate::store::{ApplicationStore, DEFAULT_DEBOUNCE, DEFAULT_KEY};

const KEY_VAR: &str = "JOBTRACK_KEY";
const DEBOUNCE_VAR: &str = "JOBTRACK_DEBOUNCE_MS";
const DATA_DIR_VAR: &str = "JOBTRACK_DATA_DIR";

/// Settings for a file-backed [`ApplicationStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Persistent key, and therefore file stem, of the collection.
    pub key: String,
    /// Quiet period before a mutation is written.
    pub debounce: Duration,
    /// Directory for the [`FileStore`].
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_owned(),
            debounce: DEFAULT_DEBOUNCE,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StoreConfig {
    /// Read `JOBTRACK_KEY`, `JOBTRACK_DEBOUNCE_MS` and `JOBTRACK_DATA_DIR`,
    /// falling back to defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](StoreConfig::from_env) with an arbitrary
    /// variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let key = match lookup(KEY_VAR) {
            Some(key) if key.trim().is_empty() => return Err(ConfigError::EmptyKey),
            Some(key) => key,
            None => {
                tracing::info!("{KEY_VAR} not set, using default: {}", defaults.key);
                defaults.key
            }
        };

        let debounce = match lookup(DEBOUNCE_VAR) {
            Some(raw) => Duration::from_millis(parse(DEBOUNCE_VAR, &raw)?),
            None => {
                tracing::info!(
                    "{DEBOUNCE_VAR} not set, using default: {}",
                    defaults.debounce.as_millis()
                );
                defaults.debounce
            }
        };

        let data_dir = lookup(DATA_DIR_VAR).map(PathBuf::from).unwrap_or_else(|| {
            tracing::info!(
                "{DATA_DIR_VAR} not set, using default: {}",
                defaults.data_dir.display()
            );
            defaults.data_dir
        });

        Ok(Self {
            key,
            debounce,
            data_dir,
        })
    }

    /// Open a file-backed store with these settings.
    ///
    /// # Errors
    ///
    /// See [`ApplicationStoreBuilder::load`](crate::ApplicationStoreBuilder::load).
    pub async fn open(&self) -> Result<ApplicationStore, StoreError> {
        ApplicationStore::builder(FileStore::new(&self.data_dir))
            .key(self.key.clone())
            .debounce(self.debounce)
            .load()
            .await
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        tracing::warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = StoreConfig::from_lookup(lookup(&[])).expect("config should load");
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.key, "jobApplications");
        assert_eq!(config.debounce, Duration::from_millis(100));
    }

    #[test]
    fn overrides_are_applied() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("JOBTRACK_KEY", "applications"),
            ("JOBTRACK_DEBOUNCE_MS", " 250 "),
            ("JOBTRACK_DATA_DIR", "/var/lib/jobtrack"),
        ]))
        .expect("config should load");

        assert_eq!(config.key, "applications");
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/jobtrack"));
    }

    #[test]
    fn invalid_debounce_is_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[("JOBTRACK_DEBOUNCE_MS", "soon")]))
            .expect_err("config should fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "JOBTRACK_DEBOUNCE_MS",
                ..
            }
        ));
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[("JOBTRACK_KEY", "  ")]))
            .expect_err("config should fail");
        assert!(matches!(err, ConfigError::EmptyKey));
    }

    #[tokio::test]
    async fn open_uses_data_dir_and_key() {
        let tmp = tempfile::tempdir().expect("failed to create tmpdir");
        let config = StoreConfig {
            key: "apps".into(),
            debounce: Duration::from_millis(10),
            data_dir: tmp.path().join("data"),
        };

        let store = config.open().await.expect("open should succeed");
        assert_eq!(store.key(), "apps");
        store.flush_now().await.expect("flush should succeed");
        store.shutdown().await.expect("shutdown should succeed");

        let written = std::fs::read_to_string(tmp.path().join("data/apps.json"))
            .expect("document should be written");
        assert_eq!(written, "[]");
    }
}
