//! Small persisted client state: recent DOIs and liked trending images.
//!
//! Values are JSON strings under fixed keys, kept in localStorage on the web
//! and in one JSON file under the platform data directory natively.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::TrendingId;
use crate::constants::{HISTORY_KEY, LIKED_IDS_KEY, MAX_HISTORY, UPLOAD_HISTORY_SENTINEL};
use crate::error::AppError;

/// String key/value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError>;
}

/// In-memory store, used by tests and as a fallback when nothing persists.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All keys in one JSON object on disk (native only).
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStore {
    path: std::path::PathBuf,
    values: BTreeMap<String, String>,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let values = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            serde_json::from_str(&json)?
        } else {
            log::debug!("No state file at {:?}, starting empty", path);
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    /// Default location: `<data dir>/paperpix/state.json`.
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::data_dir().map(|dir| dir.join("paperpix").join("state.json"))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)?;
        Ok(())
    }
}

/// Browser localStorage (WASM only).
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn open() -> Result<Self, AppError> {
        let window =
            web_sys::window().ok_or_else(|| AppError::Storage("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| AppError::Storage(format!("localStorage access error: {:?}", e)))?
            .ok_or_else(|| AppError::Storage("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.storage
            .get_item(key)
            .map_err(|e| AppError::Storage(format!("Failed to read {}: {:?}", key, e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {:?}", key, e)))
    }
}

/// Read a JSON value, falling back to the default when missing or corrupt.
fn load_json<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Ignoring corrupt value under {}: {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Failed to read {}: {}", key, e);
            T::default()
        }
    }
}

fn save_json<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), AppError> {
    store.set(key, &serde_json::to_string(value)?)
}

/// Most recent DOIs, newest first, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHistory {
    entries: Vec<String>,
}

impl SearchHistory {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut entries: Vec<String> = load_json(store, HISTORY_KEY);
        entries.truncate(MAX_HISTORY);
        Self { entries }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), AppError> {
        save_json(store, HISTORY_KEY, &self.entries)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Put `doi` at the front. Blank DOIs and uploads are not recorded.
    pub fn record(&mut self, doi: &str) -> bool {
        let doi = doi.trim();
        if doi.is_empty() || doi == UPLOAD_HISTORY_SENTINEL {
            return false;
        }
        self.entries.retain(|entry| entry != doi);
        self.entries.insert(0, doi.to_string());
        self.entries.truncate(MAX_HISTORY);
        true
    }

    pub fn remove(&mut self, doi: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != doi);
        self.entries.len() != before
    }
}

/// Trending images this client already liked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikedIds {
    ids: Vec<TrendingId>,
}

impl LikedIds {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            ids: load_json(store, LIKED_IDS_KEY),
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), AppError> {
        save_json(store, LIKED_IDS_KEY, &self.ids)
    }

    /// Ids match by their text form, so a stored `"3"` matches a numeric `3`.
    pub fn contains(&self, id: &TrendingId) -> bool {
        let wanted = id.to_string();
        self.ids.iter().any(|saved| saved.to_string() == wanted)
    }

    /// Remember `id`; returns false when it was already liked.
    pub fn insert(&mut self, id: TrendingId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_newest_first_capped_and_deduped() {
        let mut history = SearchHistory::default();
        assert!(history.record("10.1/a"));
        assert!(history.record("10.1/b"));
        assert!(history.record("10.1/a"));
        assert_eq!(history.entries(), &["10.1/a", "10.1/b"]);

        history.record("10.1/c");
        assert_eq!(history.entries(), &["10.1/c", "10.1/a"]);
    }

    #[test]
    fn test_history_skips_uploads_and_blanks() {
        let mut history = SearchHistory::default();
        assert!(!history.record(UPLOAD_HISTORY_SENTINEL));
        assert!(!history.record("  "));
        assert!(history.is_empty());
    }

    #[test]
    fn test_history_persists() {
        let mut store = MemoryStore::new();
        let mut history = SearchHistory::load(&store);
        history.record("10.1/a");
        history.save(&mut store).unwrap();

        assert_eq!(
            store.get(HISTORY_KEY).unwrap().as_deref(),
            Some(r#"["10.1/a"]"#)
        );
        assert_eq!(SearchHistory::load(&store), history);
    }

    #[test]
    fn test_history_load_truncates_and_survives_corruption() {
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, r#"["a","b","c"]"#).unwrap();
        assert_eq!(SearchHistory::load(&store).entries(), &["a", "b"]);

        store.set(HISTORY_KEY, "not json").unwrap();
        assert!(SearchHistory::load(&store).is_empty());
    }

    #[test]
    fn test_history_remove() {
        let mut history = SearchHistory::default();
        history.record("x");
        assert!(history.remove("x"));
        assert!(!history.remove("x"));
    }

    #[test]
    fn test_liked_ids_accept_numbers_and_strings() {
        let mut store = MemoryStore::new();
        store.set(LIKED_IDS_KEY, r#"[3,"abc"]"#).unwrap();
        let mut liked = LikedIds::load(&store);
        assert!(liked.contains(&TrendingId::Number(3)));
        assert!(liked.contains(&TrendingId::from("abc")));
        assert!(!liked.insert(TrendingId::Number(3)));
        assert!(liked.insert(TrendingId::Number(4)));
        assert!(liked.contains(&TrendingId::from("4")));

        liked.save(&mut store).unwrap();
        assert_eq!(LikedIds::load(&store).len(), 3);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("state.json");

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
        store.set(HISTORY_KEY, r#"["10.1/a"]"#).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            SearchHistory::load(&reopened).entries(),
            &["10.1/a".to_string()]
        );
    }
}
