//! Typed JSON persistence over a flat key→file directory.
//!
//! Two scopes: `Local` survives restarts, `Session` holds short-lived
//! snapshots (UI state, import backup). Corrupt values are logged and
//! replaced with the type's default; they never propagate as errors.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

pub const KEY_THEME: &str = "bookmarks-theme";
pub const KEY_FAVORITES: &str = "bookmarks-favorites";
pub const KEY_SEARCH_HISTORY: &str = "bookmarks-search-history";
pub const KEY_ACTIVE_TAGS: &str = "bookmarks-active-tags";
pub const KEY_COLLAPSED: &str = "bookmarks-collapsed";
pub const KEY_TAG_SECTION: &str = "bookmarks-tag-section-expanded";
pub const KEY_RECENT_VISITS: &str = "bookmarks-recent-visits";
pub const KEY_USER_DATA: &str = "bookmarks-user-data";
pub const KEY_UI_STATE: &str = "bookmarks-ui-state";
pub const KEY_IMPORT_BACKUP: &str = "bookmarks-import-backup";

const LOCAL_KEYS: &[&str] = &[
    KEY_THEME,
    KEY_FAVORITES,
    KEY_SEARCH_HISTORY,
    KEY_ACTIVE_TAGS,
    KEY_COLLAPSED,
    KEY_TAG_SECTION,
    KEY_RECENT_VISITS,
    KEY_USER_DATA,
];

const SESSION_KEYS: &[&str] = &[KEY_UI_STATE, KEY_IMPORT_BACKUP];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Session,
}

impl Scope {
    fn dir_name(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Session => "session",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageAdapter {
    root: PathBuf,
}

impl StorageAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default data directory: `$HOME/.bookmark-organizer`.
    pub fn open_default() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(Self::new(PathBuf::from(home).join(".bookmark-organizer")))
    }

    fn path_for(&self, scope: Scope, key: &str) -> PathBuf {
        self.root.join(scope.dir_name()).join(format!("{key}.json"))
    }

    /// Read a value, falling back to the type's default when the key is
    /// missing or its content cannot be parsed.
    pub fn get<T: DeserializeOwned + Default>(&self, scope: Scope, key: &str) -> T {
        self.get_opt(scope, key).unwrap_or_default()
    }

    /// Read a value; `None` when missing or unparseable.
    pub fn get_opt<T: DeserializeOwned>(&self, scope: Scope, key: &str) -> Option<T> {
        let path = self.path_for(scope, key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("⚠️  Could not parse stored value for '{}': {}", key, e);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, scope: Scope, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(scope, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create storage dir {parent:?}"))?;
        }
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content).with_context(|| format!("failed to write '{key}'"))?;
        Ok(())
    }

    pub fn remove(&self, scope: Scope, key: &str) {
        let path = self.path_for(scope, key);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("⚠️  Could not remove stored value '{}': {}", key, e);
            }
        }
    }

    pub fn contains(&self, scope: Scope, key: &str) -> bool {
        self.path_for(scope, key).exists()
    }

    /// Remove every known key in both scopes. Backs `clear-data`.
    pub fn clear_all(&self) {
        for key in LOCAL_KEYS {
            self.remove(Scope::Local, key);
        }
        for key in SESSION_KEYS {
            self.remove(Scope::Session, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn adapter() -> (TempDir, StorageAdapter) {
        let dir = TempDir::new().unwrap();
        let storage = StorageAdapter::new(dir.path());
        (dir, storage)
    }

    #[test]
    fn roundtrips_typed_values() {
        let (_dir, storage) = adapter();
        let favorites: BTreeSet<String> = ["https://a".to_string(), "https://b".to_string()]
            .into_iter()
            .collect();
        storage.set(Scope::Local, KEY_FAVORITES, &favorites).unwrap();
        let loaded: BTreeSet<String> = storage.get(Scope::Local, KEY_FAVORITES);
        assert_eq!(loaded, favorites);
    }

    #[test]
    fn missing_key_yields_default() {
        let (_dir, storage) = adapter();
        let history: Vec<String> = storage.get(Scope::Local, KEY_SEARCH_HISTORY);
        assert!(history.is_empty());
    }

    #[test]
    fn corrupt_value_yields_default() {
        let (dir, storage) = adapter();
        let path = dir.path().join("local").join(format!("{KEY_RECENT_VISITS}.json"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json at all").unwrap();
        let visits: Vec<crate::model::VisitRecord> = storage.get(Scope::Local, KEY_RECENT_VISITS);
        assert!(visits.is_empty());
    }

    #[test]
    fn scopes_do_not_collide() {
        let (_dir, storage) = adapter();
        storage.set(Scope::Local, "k", &1u32).unwrap();
        storage.set(Scope::Session, "k", &2u32).unwrap();
        assert_eq!(storage.get::<u32>(Scope::Local, "k"), 1);
        assert_eq!(storage.get::<u32>(Scope::Session, "k"), 2);
    }

    #[test]
    fn clear_all_removes_known_keys() {
        let (_dir, storage) = adapter();
        storage.set(Scope::Local, KEY_THEME, &"dark-mode").unwrap();
        storage.set(Scope::Session, KEY_UI_STATE, &"snapshot").unwrap();
        storage.clear_all();
        assert!(!storage.contains(Scope::Local, KEY_THEME));
        assert!(!storage.contains(Scope::Session, KEY_UI_STATE));
    }
}
