//! Builds portable export documents from user-owned state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::app::App;
use crate::model::{now_millis, UserDataFile, VisitRecord};
use crate::store::USER_DATA_VERSION;

pub const EXPORT_VERSION: &str = "1.0";
pub const EXPORT_SOURCE: &str = "bookmark-organizer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportKind {
    /// Bookmarks and settings
    #[default]
    Full,
    /// User bookmarks only
    Bookmarks,
    /// Settings only
    Settings,
    /// Explicitly selected categories and settings
    Selective,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Full => "full",
            ExportKind::Bookmarks => "bookmarks",
            ExportKind::Settings => "settings",
            ExportKind::Selective => "selective",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum SettingKey {
    Favorites,
    RecentVisits,
    Theme,
    SearchHistory,
    /// Collapsed categories, active tags and the tag-section flag
    UiPreferences,
}

/// What a selective export should include.
#[derive(Debug, Clone, Default)]
pub struct ExportSelection {
    /// User category ids.
    pub categories: BTreeSet<String>,
    /// Catalog category ids whose injected bookmarks are wanted.
    pub existing: BTreeSet<String>,
    pub settings: BTreeSet<SettingKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub export_date: String,
    #[serde(default)]
    pub export_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub total_bookmarks: usize,
    #[serde(default)]
    pub total_categories: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_visits: Option<Vec<VisitRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed_categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_history: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_section_expanded: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub export_info: ExportInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_bookmarks: Option<UserDataFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings: Option<UserSettings>,
}

/// Bookmarks across both overlay shapes.
pub fn count_bookmarks(data: &UserDataFile) -> usize {
    let in_categories: usize = data.overlay.categories.iter().map(|c| c.bookmarks.len()).sum();
    let injected: usize = data
        .overlay
        .bookmarks_in_existing_categories
        .values()
        .map(|b| b.len())
        .sum();
    in_categories + injected
}

fn settings_snapshot(app: &App, keys: Option<&BTreeSet<SettingKey>>) -> UserSettings {
    let wanted = |key: SettingKey| keys.map_or(true, |set| set.contains(&key));
    let mut settings = UserSettings::default();
    if wanted(SettingKey::Favorites) {
        settings.favorites = Some(app.favorites.iter().cloned().collect());
    }
    if wanted(SettingKey::RecentVisits) {
        settings.recent_visits = Some(app.visits.entries().to_vec());
    }
    if wanted(SettingKey::Theme) {
        settings.theme = Some(app.theme.clone());
    }
    if wanted(SettingKey::SearchHistory) {
        settings.search_history = Some(app.search_history.clone());
    }
    if wanted(SettingKey::UiPreferences) {
        settings.collapsed_categories = Some(app.collapsed_categories.iter().cloned().collect());
        settings.active_tags = Some(app.active_tags.iter().cloned().collect());
        settings.tag_section_expanded = Some(app.tag_section_expanded);
    }
    settings
}

fn bookmarks_snapshot(app: &App, selection: Option<&ExportSelection>) -> UserDataFile {
    let overlay = app.store.overlay();
    let mut data = UserDataFile {
        version: USER_DATA_VERSION.to_string(),
        last_modified: now_millis(),
        ..Default::default()
    };

    match selection {
        None => data.overlay = overlay.clone(),
        Some(selection) => {
            data.overlay.categories = overlay
                .categories
                .iter()
                .filter(|c| selection.categories.contains(&c.id))
                .cloned()
                .collect();
            data.overlay.bookmarks_in_existing_categories = overlay
                .bookmarks_in_existing_categories
                .iter()
                .filter(|(id, bookmarks)| selection.existing.contains(*id) && !bookmarks.is_empty())
                .map(|(id, bookmarks)| (id.clone(), bookmarks.clone()))
                .collect();
        }
    }

    data
}

/// Assemble the export document for the chosen kind. `selection` is only
/// consulted for `ExportKind::Selective`.
pub fn generate_export_data(app: &App, kind: ExportKind, selection: &ExportSelection) -> ExportDocument {
    let mut doc = ExportDocument {
        export_info: ExportInfo {
            version: EXPORT_VERSION.to_string(),
            export_date: Utc::now().to_rfc3339(),
            export_type: kind.as_str().to_string(),
            source: EXPORT_SOURCE.to_string(),
            total_bookmarks: 0,
            total_categories: 0,
        },
        user_bookmarks: None,
        user_settings: None,
    };

    match kind {
        ExportKind::Full => {
            doc.user_bookmarks = Some(bookmarks_snapshot(app, None));
            doc.user_settings = Some(settings_snapshot(app, None));
        }
        ExportKind::Bookmarks => {
            doc.user_bookmarks = Some(bookmarks_snapshot(app, None));
        }
        ExportKind::Settings => {
            doc.user_settings = Some(settings_snapshot(app, None));
        }
        ExportKind::Selective => {
            if !selection.categories.is_empty() || !selection.existing.is_empty() {
                doc.user_bookmarks = Some(bookmarks_snapshot(app, Some(selection)));
            }
            if !selection.settings.is_empty() {
                doc.user_settings = Some(settings_snapshot(app, Some(&selection.settings)));
            }
        }
    }

    if let Some(data) = &doc.user_bookmarks {
        doc.export_info.total_bookmarks = count_bookmarks(data);
        doc.export_info.total_categories = data.overlay.categories.len();
    }

    doc
}

/// `bookmarks-export-<YYYY-MM-DD>.json`
pub fn default_export_filename() -> String {
    format!("bookmarks-export-{}.json", Utc::now().format("%Y-%m-%d"))
}
