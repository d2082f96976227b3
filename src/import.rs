//! Import validation, conflict detection and reconciliation.
//!
//! A document is rejected in full before any mutation; once accepted, the
//! chosen conflict policy applies uniformly to every conflicting item.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::app::{App, DEFAULT_THEME};
use crate::export::{ExportDocument, UserSettings};
use crate::model::{generate_category_id, now_millis, Bookmark, Category, UserOverlay, VisitRecord};
use crate::storage::{Scope, KEY_IMPORT_BACKUP};

pub const IMPORTED_SUFFIX: &str = " (Imported)";

/// Per-import reconciliation policy, applied to every detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConflictPolicy {
    /// Drop conflicting items
    #[default]
    Skip,
    /// Replace the existing item
    Overwrite,
    /// Import under a new name
    Rename,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import files must use the .json extension")]
    WrongExtension,
    #[error("could not read import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("not a recognized export document")]
    InvalidFormat,
}

/// Structural validation, checked on the raw value before typed
/// deserialization so a malformed document cannot mutate anything.
pub fn is_valid_export_format(value: &serde_json::Value) -> bool {
    let info = &value["exportInfo"];
    let has_str = |v: &serde_json::Value| v.as_str().is_some_and(|s| !s.is_empty());
    if !has_str(&info["version"]) || !has_str(&info["source"]) {
        return false;
    }

    let bookmarks = &value["userBookmarks"];
    let settings = &value["userSettings"];
    if bookmarks.is_null() && settings.is_null() {
        return false;
    }

    if !bookmarks.is_null() {
        if !bookmarks["version"].is_string()
            || !bookmarks["categories"].is_array()
            || !bookmarks["bookmarksInExistingCategories"].is_object()
        {
            return false;
        }
    }

    true
}

/// Load and validate an import file. Fails closed: wrong extension,
/// unparseable JSON and unrecognized documents are all rejected here.
pub fn load_import_file(path: &Path) -> Result<ExportDocument, ImportError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(ImportError::WrongExtension);
    }

    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    if !is_valid_export_format(&value) {
        return Err(ImportError::InvalidFormat);
    }

    serde_json::from_value(value).map_err(ImportError::Parse)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Conflict {
    Category { name: String },
    Bookmark { name: String, url: String },
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::Category { name } => write!(f, "Category \"{name}\" already exists"),
            Conflict::Bookmark { name, url } => {
                write!(f, "Bookmark \"{name}\" ({url}) already exists")
            }
        }
    }
}

fn flatten_bookmarks(overlay: &UserOverlay) -> Vec<&Bookmark> {
    overlay
        .categories
        .iter()
        .flat_map(|c| c.bookmarks.iter())
        .chain(overlay.bookmarks_in_existing_categories.values().flatten())
        .collect()
}

/// Surface every conflict the document would run into. Nothing is
/// resolved here; the caller picks a policy.
pub fn check_import_conflicts(app: &App, doc: &ExportDocument) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let Some(data) = &doc.user_bookmarks else {
        return conflicts;
    };

    for category in &data.overlay.categories {
        let clash = app
            .store
            .overlay()
            .categories
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&category.name));
        if clash {
            conflicts.push(Conflict::Category {
                name: category.name.clone(),
            });
        }
    }

    for bookmark in flatten_bookmarks(&data.overlay) {
        if app.store.is_duplicate_url(&bookmark.url) {
            conflicts.push(Conflict::Bookmark {
                name: bookmark.name.clone(),
                url: bookmark.url.clone(),
            });
        }
    }

    conflicts
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImportSummary {
    pub bookmarks_imported: usize,
    pub categories_imported: usize,
}

/// Pre-import snapshot written to session storage before any mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBackup {
    pub timestamp: i64,
    pub user_bookmarks: UserOverlay,
    pub favorites: Vec<String>,
    pub recent_visits: Vec<VisitRecord>,
    pub theme: String,
    pub collapsed_categories: Vec<String>,
    pub active_tags: Vec<String>,
    pub search_history: Vec<String>,
    pub tag_section_expanded: bool,
}

fn create_import_backup(app: &App) -> Result<()> {
    let backup = ImportBackup {
        timestamp: now_millis(),
        user_bookmarks: app.store.overlay().clone(),
        favorites: app.favorites.iter().cloned().collect(),
        recent_visits: app.visits.entries().to_vec(),
        theme: app.theme.clone(),
        collapsed_categories: app.collapsed_categories.iter().cloned().collect(),
        active_tags: app.active_tags.iter().cloned().collect(),
        search_history: app.search_history.clone(),
        tag_section_expanded: app.tag_section_expanded,
    };
    app.storage.set(Scope::Session, KEY_IMPORT_BACKUP, &backup)
}

fn stamp_imported(bookmark: &mut Bookmark) {
    bookmark.is_user_created = true;
    bookmark.date_added = Some(now_millis());
}

fn import_category(app: &mut App, mut category: Category, policy: ConflictPolicy) -> bool {
    category.is_user_created = true;
    for bookmark in &mut category.bookmarks {
        stamp_imported(bookmark);
    }

    let existing_idx = app
        .store
        .overlay()
        .categories
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(&category.name));

    match existing_idx {
        Some(idx) => match policy {
            ConflictPolicy::Skip => false,
            ConflictPolicy::Overwrite => {
                app.store.overlay_mut().categories[idx] = category;
                true
            }
            ConflictPolicy::Rename => {
                category.id = generate_category_id();
                category.name.push_str(IMPORTED_SUFFIX);
                app.store.overlay_mut().categories.push(category);
                true
            }
        },
        None => {
            category.id = generate_category_id();
            app.store.overlay_mut().categories.push(category);
            true
        }
    }
}

fn import_bookmark_to_existing(
    app: &mut App,
    mut bookmark: Bookmark,
    category_id: &str,
    policy: ConflictPolicy,
) -> Result<bool> {
    if app.store.is_duplicate_url(&bookmark.url) {
        match policy {
            ConflictPolicy::Skip => return Ok(false),
            ConflictPolicy::Overwrite => {
                app.store.remove_bookmark_by_url(&bookmark.url);
                if app.favorites.remove(&bookmark.url) {
                    app.save_favorites()?;
                }
            }
            // keeps the duplicate url on purpose: rename resolves the name,
            // the validator keeps reporting the url pair
            ConflictPolicy::Rename => bookmark.name.push_str(IMPORTED_SUFFIX),
        }
    }

    stamp_imported(&mut bookmark);
    app.store
        .overlay_mut()
        .bookmarks_in_existing_categories
        .entry(category_id.to_string())
        .or_default()
        .push(bookmark);
    Ok(true)
}

fn import_settings(app: &mut App, settings: &UserSettings, policy: ConflictPolicy) -> Result<()> {
    if let Some(favorites) = &settings.favorites {
        for url in favorites {
            app.favorites.insert(url.clone());
        }
        app.save_favorites()?;
    }

    if let Some(visits) = &settings.recent_visits {
        app.visits.merge_imported(visits);
        app.save_visits()?;
    }

    if let Some(theme) = &settings.theme {
        if policy == ConflictPolicy::Overwrite || app.theme == DEFAULT_THEME {
            app.set_theme(theme)?;
        }
    }

    if let Some(history) = &settings.search_history {
        for term in history {
            if !app.search_history.contains(term) {
                app.search_history.push(term.clone());
            }
        }
        app.search_history.truncate(10);
        app.save_search_history()?;
    }

    if let Some(collapsed) = &settings.collapsed_categories {
        app.collapsed_categories.extend(collapsed.iter().cloned());
        app.save_collapsed()?;
    }

    if let Some(tags) = &settings.active_tags {
        app.active_tags.extend(tags.iter().cloned());
        app.save_active_tags()?;
    }

    if let Some(expanded) = settings.tag_section_expanded {
        app.tag_section_expanded = expanded;
        app.save_tag_section()?;
    }

    Ok(())
}

/// Apply a validated document under the chosen policy. A full pre-import
/// backup goes to session storage before the first mutation.
pub fn execute_import(
    app: &mut App,
    doc: &ExportDocument,
    policy: ConflictPolicy,
) -> Result<ImportSummary> {
    create_import_backup(app)?;

    let mut summary = ImportSummary::default();

    if let Some(data) = &doc.user_bookmarks {
        for category in &data.overlay.categories {
            let bookmark_count = category.bookmarks.len();
            if import_category(app, category.clone(), policy) {
                summary.categories_imported += 1;
                summary.bookmarks_imported += bookmark_count;
            } else {
                info!("⏭️  Skipped category '{}'", category.name);
            }
        }

        for (category_id, bookmarks) in &data.overlay.bookmarks_in_existing_categories {
            for bookmark in bookmarks {
                if import_bookmark_to_existing(app, bookmark.clone(), category_id, policy)? {
                    summary.bookmarks_imported += 1;
                } else {
                    info!("⏭️  Skipped bookmark '{}'", bookmark.name);
                }
            }
        }
    }

    if let Some(settings) = &doc.user_settings {
        import_settings(app, settings, policy)?;
    }

    app.store.save(&app.storage)?;

    if summary == ImportSummary::default() && doc.user_bookmarks.is_some() {
        warn!("⚠️  Nothing imported; every item was skipped");
    }

    Ok(summary)
}
