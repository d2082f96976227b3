//! Owns the read-only catalog and the user overlay.
//!
//! Every add and import funnels through `is_duplicate_url`, the single
//! deduplication gate for the whole application.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::merge;
use crate::model::{
    generate_category_id, now_millis, Bookmark, BookmarkKind, Catalog, Category, SupportType,
    UserDataFile, UserOverlay,
};
use crate::storage::{Scope, StorageAdapter, KEY_USER_DATA};

pub const USER_DATA_VERSION: &str = "1.0";

/// Field-level validation failures for a manual add.
#[derive(Debug, Error, PartialEq)]
pub enum AddError {
    #[error("name is required")]
    NameRequired,
    #[error("url is required")]
    UrlRequired,
    #[error("'{0}' is not a valid http(s) url")]
    InvalidUrl(String),
    #[error("this url already exists in your bookmarks")]
    DuplicateUrl,
    #[error("category '{0}' does not exist")]
    UnknownCategory(String),
}

/// Input for a manual add; stamping and routing happen in the store.
#[derive(Debug, Clone, Default)]
pub struct NewBookmark {
    pub name: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub logo: Option<String>,
    pub kind: BookmarkKind,
    pub support_type: SupportType,
}

pub struct BookmarkStore {
    catalog: Catalog,
    overlay: UserOverlay,
}

fn url_fingerprint(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Overlay entries must carry the user-created stamp or repeated merges
/// would duplicate them; enforce it whenever an overlay enters the store.
fn normalize_overlay(overlay: &mut UserOverlay) {
    for category in &mut overlay.categories {
        category.is_user_created = true;
        for bookmark in &mut category.bookmarks {
            bookmark.is_user_created = true;
        }
    }
    for bookmarks in overlay.bookmarks_in_existing_categories.values_mut() {
        for bookmark in bookmarks {
            bookmark.is_user_created = true;
        }
    }
}

impl BookmarkStore {
    pub fn new(catalog: Catalog, mut overlay: UserOverlay) -> Self {
        normalize_overlay(&mut overlay);
        Self { catalog, overlay }
    }

    /// Read the overlay from storage. Missing or corrupt data resets to an
    /// empty overlay (the adapter logs the warning); this never fails.
    pub fn load(catalog: Catalog, storage: &StorageAdapter) -> Self {
        let data: UserDataFile = storage.get(Scope::Local, KEY_USER_DATA);
        Self::new(catalog, data.overlay)
    }

    pub fn save(&self, storage: &StorageAdapter) -> Result<()> {
        let data = UserDataFile {
            version: USER_DATA_VERSION.to_string(),
            last_modified: now_millis(),
            overlay: self.overlay.clone(),
        };
        storage.set(Scope::Local, KEY_USER_DATA, &data)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn overlay(&self) -> &UserOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut UserOverlay {
        &mut self.overlay
    }

    /// The display catalog, computed fresh on every call.
    pub fn working_catalog(&self) -> Catalog {
        merge::merge(&self.catalog, &self.overlay)
    }

    /// True when the url exists anywhere: catalog, overlay categories, or
    /// injected per-category lists. Exact, case-sensitive match.
    pub fn is_duplicate_url(&self, url: &str) -> bool {
        self.url_index().contains(&url_fingerprint(url))
    }

    fn url_index(&self) -> HashSet<String> {
        let mut index = HashSet::new();
        for category in &self.catalog.categories {
            for bookmark in &category.bookmarks {
                index.insert(url_fingerprint(&bookmark.url));
            }
        }
        for category in &self.overlay.categories {
            for bookmark in &category.bookmarks {
                index.insert(url_fingerprint(&bookmark.url));
            }
        }
        for bookmarks in self.overlay.bookmarks_in_existing_categories.values() {
            for bookmark in bookmarks {
                index.insert(url_fingerprint(&bookmark.url));
            }
        }
        index
    }

    /// Linear scan across the working catalog; first match wins.
    pub fn find_by_url(&self, url: &str) -> Option<Bookmark> {
        self.working_catalog()
            .categories
            .into_iter()
            .flat_map(|c| c.bookmarks)
            .find(|b| b.url == url)
    }

    fn is_catalog_category(&self, id: &str) -> bool {
        self.catalog.categories.iter().any(|c| c.id == id)
    }

    /// Validate and add one bookmark to a user category or as an injection
    /// into an existing catalog category.
    pub fn add_bookmark(&mut self, new: NewBookmark, category_id: &str) -> Result<(), AddError> {
        if new.name.trim().is_empty() {
            return Err(AddError::NameRequired);
        }
        if new.url.is_empty() {
            return Err(AddError::UrlRequired);
        }
        if !new.url.starts_with("http://") && !new.url.starts_with("https://") {
            return Err(AddError::InvalidUrl(new.url));
        }
        if self.is_duplicate_url(&new.url) {
            return Err(AddError::DuplicateUrl);
        }

        let bookmark = Bookmark {
            name: new.name,
            url: new.url,
            description: new.description,
            tags: new.tags,
            logo: new.logo,
            kind: new.kind,
            support_type: new.support_type,
            is_user_created: true,
            date_added: Some(now_millis()),
        };

        if let Some(idx) = self.overlay.categories.iter().position(|c| c.id == category_id) {
            self.overlay.categories[idx].bookmarks.push(bookmark);
        } else if self.is_catalog_category(category_id) {
            self.overlay
                .bookmarks_in_existing_categories
                .entry(category_id.to_string())
                .or_default()
                .push(bookmark);
        } else {
            return Err(AddError::UnknownCategory(category_id.to_string()));
        }

        Ok(())
    }

    /// Create a user-owned category and return its generated id.
    pub fn create_category(&mut self, name: &str, color: &str) -> String {
        let id = generate_category_id();
        self.overlay.categories.push(Category {
            id: id.clone(),
            name: name.to_string(),
            description: format!("Custom category: {name}"),
            color: color.to_string(),
            is_user_created: true,
            bookmarks: vec![],
        });
        id
    }

    /// Remove the bookmark with this url from every overlay location.
    /// Favorites are the caller's concern.
    pub fn remove_bookmark_by_url(&mut self, url: &str) {
        for category in &mut self.overlay.categories {
            category.bookmarks.retain(|b| b.url != url);
        }
        for bookmarks in self.overlay.bookmarks_in_existing_categories.values_mut() {
            bookmarks.retain(|b| b.url != url);
        }
    }

    /// Absorb a pre-seeded overlay supplied next to the catalog: categories
    /// dedupe by id, injected bookmarks dedupe by url within their list.
    /// Returns true when anything was taken so the caller can persist.
    pub fn absorb_preseed(&mut self, mut seed: UserOverlay) -> bool {
        normalize_overlay(&mut seed);
        let mut changed = false;

        for category in seed.categories {
            if self.overlay.categories.iter().any(|c| c.id == category.id) {
                debug!("Pre-seed category '{}' already present, skipping", category.id);
                continue;
            }
            info!("📥 Absorbing pre-seeded category '{}'", category.name);
            self.overlay.categories.push(category);
            changed = true;
        }

        for (category_id, bookmarks) in seed.bookmarks_in_existing_categories {
            let existing = self
                .overlay
                .bookmarks_in_existing_categories
                .entry(category_id)
                .or_default();
            for bookmark in bookmarks {
                if existing.iter().any(|b| b.url == bookmark.url) {
                    continue;
                }
                existing.push(bookmark);
                changed = true;
            }
        }

        changed
    }
}
