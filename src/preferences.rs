//! Key-value preferences that outlive a session.
//!
//! Only the last search text is persisted, under [`SEARCH_TEXT_KEY`].

use async_trait::async_trait;
use fjall::{Database, Keyspace};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::task;
use tracing::debug;

use crate::config::PreferencesConfig;
use crate::{PlaceMapError, Result};

/// Key of the persisted search field contents
pub const SEARCH_TEXT_KEY: &str = "searchText";

/// Storage for simple string preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// # Errors
    /// The backing store could not be read or holds a malformed value.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// # Errors
    /// The backing store could not be written.
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;
}

/// Preferences kept in memory only
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with one preset value
    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        Self {
            values: Mutex::new(HashMap::from([(key.to_string(), value.to_string())])),
        }
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| PlaceMapError::preferences("preference map lock poisoned"))
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences persisted in a fjall keyspace, values postcard-encoded.
///
/// Reads and writes run on the blocking pool.
pub struct FjallPreferences {
    _db: Database,
    store: Keyspace,
}

fn get_from_store(
    store: Keyspace,
    key: Vec<u8>,
) -> std::result::Result<Option<Vec<u8>>, fjall::Error> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl FjallPreferences {
    /// Open (or create) the preference database at `path`
    ///
    /// # Errors
    /// The database could not be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::builder(path)
            .open()
            .map_err(|e| PlaceMapError::preferences(format!("Failed to open {}: {e}", path.display())))?;
        let store = db
            .keyspace("preferences", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| PlaceMapError::preferences(format!("Failed to open keyspace: {e}")))?;
        debug!("Opened preference store at {}", path.display());
        Ok(Self { _db: db, store })
    }

    /// Open the database at the configured path
    ///
    /// # Errors
    /// The database could not be opened.
    pub fn from_config(config: &PreferencesConfig) -> Result<Self> {
        Self::open(&config.path)
    }
}

#[async_trait]
impl PreferenceStore for FjallPreferences {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let bytes = task::spawn_blocking(move || get_from_store(store, key_bytes))
            .await
            .map_err(|e| PlaceMapError::preferences(format!("Read task for '{key}' failed: {e}")))?
            .map_err(|e| PlaceMapError::preferences(format!("Failed to read '{key}': {e}")))?;

        bytes
            .map(|bytes| {
                postcard::from_bytes::<String>(&bytes).map_err(|e| {
                    PlaceMapError::preferences(format!("Malformed value for '{key}': {e}"))
                })
            })
            .transpose()
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();
        let bytes = postcard::to_stdvec(value)
            .map_err(|e| PlaceMapError::preferences(format!("Failed to encode '{key}': {e}")))?;

        task::spawn_blocking(move || store.insert(key_bytes, bytes))
            .await
            .map_err(|e| PlaceMapError::preferences(format!("Write task for '{key}' failed: {e}")))?
            .map_err(|e| PlaceMapError::preferences(format!("Failed to write '{key}': {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_preferences() {
        let preferences = MemoryPreferences::new();
        assert_eq!(preferences.get_string(SEARCH_TEXT_KEY).await.unwrap(), None);

        preferences.set_string(SEARCH_TEXT_KEY, "paris").await.unwrap();
        assert_eq!(
            preferences.get_string(SEARCH_TEXT_KEY).await.unwrap().as_deref(),
            Some("paris")
        );
    }

    #[tokio::test]
    async fn test_fjall_preferences_store_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let preferences = FjallPreferences::open(dir.path().join("prefs")).unwrap();

        assert_eq!(preferences.get_string(SEARCH_TEXT_KEY).await.unwrap(), None);
        preferences.set_string(SEARCH_TEXT_KEY, "Zürich").await.unwrap();
        assert_eq!(
            preferences.get_string(SEARCH_TEXT_KEY).await.unwrap().as_deref(),
            Some("Zürich")
        );

        preferences.set_string(SEARCH_TEXT_KEY, "").await.unwrap();
        assert_eq!(
            preferences.get_string(SEARCH_TEXT_KEY).await.unwrap().as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn test_fjall_preferences_from_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = PreferencesConfig {
            path: dir.path().join("configured").to_string_lossy().into_owned(),
        };

        let preferences = FjallPreferences::from_config(&config).unwrap();
        preferences.set_string(SEARCH_TEXT_KEY, "Bergen").await.unwrap();

        assert!(dir.path().join("configured").exists());
        assert_eq!(
            preferences.get_string(SEARCH_TEXT_KEY).await.unwrap().as_deref(),
            Some("Bergen")
        );
    }
}
