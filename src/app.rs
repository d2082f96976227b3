//! Application state: everything the engines operate on.
//!
//! One explicit struct owned by the caller; engines receive it by
//! reference. Personal state persists after every mutation, the catalog
//! stays read-only for the whole session.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::filter::FilterState;
use crate::model::{now_millis, Bookmark, Catalog, UserOverlay, VisitRecord};
use crate::storage::{
    Scope, StorageAdapter, KEY_ACTIVE_TAGS, KEY_COLLAPSED, KEY_FAVORITES, KEY_RECENT_VISITS,
    KEY_SEARCH_HISTORY, KEY_TAG_SECTION, KEY_THEME,
};
use crate::store::BookmarkStore;
use crate::visits::RecentVisits;

/// Factory default theme; settings import only replaces it when asked to
/// overwrite or while this is still the active theme.
pub const DEFAULT_THEME: &str = "eco-lime";

const SEARCH_HISTORY_CAP: usize = 10;
const SEARCH_HISTORY_MIN_LEN: usize = 3;

pub struct App {
    pub storage: StorageAdapter,
    pub store: BookmarkStore,
    pub favorites: BTreeSet<String>,
    pub visits: RecentVisits,
    pub search_history: Vec<String>,
    pub active_tags: BTreeSet<String>,
    pub collapsed_categories: BTreeSet<String>,
    pub tag_section_expanded: bool,
    pub theme: String,
    /// In-session only; survives reloads solely through the UI snapshot.
    pub search_term: String,
}

impl App {
    /// Load the catalog from disk and rehydrate personal state from
    /// storage. A missing or broken catalog is fatal and surfaced with
    /// context; everything personal falls back to its empty default.
    pub fn load(catalog_path: &Path, storage: StorageAdapter) -> Result<Self> {
        let content = fs::read_to_string(catalog_path)
            .with_context(|| format!("could not load catalog from {catalog_path:?}"))?;
        let catalog: Catalog = serde_json::from_str(&content)
            .with_context(|| format!("catalog {catalog_path:?} is not valid JSON"))?;

        let mut store = BookmarkStore::load(catalog, &storage);

        // optional pre-seed overlay shipped next to the catalog
        let preseed_path = catalog_path.with_file_name("user-bookmarks.json");
        if preseed_path.exists() {
            match fs::read_to_string(&preseed_path)
                .map_err(anyhow::Error::from)
                .and_then(|c| serde_json::from_str::<UserOverlay>(&c).map_err(Into::into))
            {
                Ok(seed) => {
                    if store.absorb_preseed(seed) {
                        store.save(&storage)?;
                    }
                }
                Err(e) => warn!("⚠️  Ignoring unreadable pre-seed {preseed_path:?}: {e}"),
            }
        }

        let collapsed = if storage.contains(Scope::Local, KEY_COLLAPSED) {
            storage.get(Scope::Local, KEY_COLLAPSED)
        } else {
            // the recently-visited section starts collapsed
            BTreeSet::from(["recent-visits".to_string()])
        };

        let raw_visits: Vec<VisitRecord> = storage.get(Scope::Local, KEY_RECENT_VISITS);

        Ok(Self {
            store,
            favorites: storage.get(Scope::Local, KEY_FAVORITES),
            visits: RecentVisits::from_entries(raw_visits, now_millis()),
            search_history: storage.get(Scope::Local, KEY_SEARCH_HISTORY),
            active_tags: storage.get(Scope::Local, KEY_ACTIVE_TAGS),
            collapsed_categories: collapsed,
            tag_section_expanded: storage.get(Scope::Local, KEY_TAG_SECTION),
            theme: storage
                .get_opt(Scope::Local, KEY_THEME)
                .unwrap_or_else(|| DEFAULT_THEME.to_string()),
            search_term: String::new(),
            storage,
        })
    }

    pub fn filter_state(&self) -> FilterState {
        FilterState::new(&self.search_term, self.active_tags.clone())
    }

    pub fn save_favorites(&self) -> Result<()> {
        self.storage.set(Scope::Local, KEY_FAVORITES, &self.favorites)
    }

    pub fn save_visits(&self) -> Result<()> {
        self.storage.set(Scope::Local, KEY_RECENT_VISITS, &self.visits.entries())
    }

    pub fn save_search_history(&self) -> Result<()> {
        self.storage.set(Scope::Local, KEY_SEARCH_HISTORY, &self.search_history)
    }

    pub fn save_active_tags(&self) -> Result<()> {
        self.storage.set(Scope::Local, KEY_ACTIVE_TAGS, &self.active_tags)
    }

    pub fn save_collapsed(&self) -> Result<()> {
        self.storage.set(Scope::Local, KEY_COLLAPSED, &self.collapsed_categories)
    }

    pub fn save_tag_section(&self) -> Result<()> {
        self.storage.set(Scope::Local, KEY_TAG_SECTION, &self.tag_section_expanded)
    }

    /// Toggle a favorite; returns true when the url is now favorited.
    pub fn toggle_favorite(&mut self, url: &str) -> Result<bool> {
        let added = if self.favorites.contains(url) {
            self.favorites.remove(url);
            false
        } else {
            self.favorites.insert(url.to_string());
            true
        };
        self.save_favorites()?;
        Ok(added)
    }

    /// Favorites resolved against the working catalog; stale urls drop out.
    pub fn favorite_bookmarks(&self) -> Vec<Bookmark> {
        self.favorites
            .iter()
            .filter_map(|url| self.store.find_by_url(url))
            .collect()
    }

    /// Record a visit for the bookmark with this url. Unknown urls are
    /// reported, not tracked.
    pub fn track_visit(&mut self, url: &str) -> Result<Option<Bookmark>> {
        let Some(bookmark) = self.store.find_by_url(url) else {
            return Ok(None);
        };
        self.visits.track(&bookmark, now_millis());
        self.save_visits()?;
        Ok(Some(bookmark))
    }

    /// Remember a search term: at least 3 characters, deduped, newest
    /// first, capped at 10.
    pub fn add_search_history(&mut self, term: &str) -> Result<()> {
        let term = term.trim();
        if term.chars().count() < SEARCH_HISTORY_MIN_LEN {
            return Ok(());
        }
        self.search_history.retain(|t| t != term);
        self.search_history.insert(0, term.to_string());
        self.search_history.truncate(SEARCH_HISTORY_CAP);
        self.save_search_history()
    }

    /// Toggle an active tag filter; returns true when the tag is now on.
    pub fn toggle_tag(&mut self, tag: &str) -> Result<bool> {
        let added = if self.active_tags.contains(tag) {
            self.active_tags.remove(tag);
            false
        } else {
            self.active_tags.insert(tag.to_string());
            true
        };
        self.save_active_tags()?;
        Ok(added)
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        self.theme = theme.to_string();
        self.storage.set(Scope::Local, KEY_THEME, &self.theme)
    }

    /// Every tag in the working catalog with its usage count.
    pub fn all_tags(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for category in &self.store.working_catalog().categories {
            for bookmark in &category.bookmarks {
                for tag in &bookmark.tags {
                    *counts.entry(tag.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Wipe all personal data, in memory and in storage.
    pub fn clear_all_data(&mut self) {
        info!("🧹 Clearing all personal data");
        self.storage.clear_all();
        self.store = BookmarkStore::new(self.store.catalog().clone(), UserOverlay::default());
        self.favorites.clear();
        self.visits = RecentVisits::default();
        self.search_history.clear();
        self.active_tags.clear();
        self.collapsed_categories = BTreeSet::from(["recent-visits".to_string()]);
        self.tag_section_expanded = false;
        self.theme = DEFAULT_THEME.to_string();
        self.search_term.clear();
    }
}
