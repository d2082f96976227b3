//! Core data types shared by every engine.
//!
//! Wire names are camelCase to stay compatible with previously exported
//! documents (`isUserCreated`, `dateAdded`, `bookmarksInExistingCategories`).

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

/// How a bookmark is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkKind {
    #[default]
    Web,
    Desktop,
}

/// Support flow attached to a bookmark.
///
/// Catalogs in the wild carry free-form strings here; the legacy values
/// `ticket`, `popup` and `none` are still accepted, and anything unknown
/// falls back to `Help` with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SupportType {
    #[default]
    Help,
    SplitHelp,
    ApprovalProcess,
}

impl SupportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportType::Help => "help",
            SupportType::SplitHelp => "split-help",
            SupportType::ApprovalProcess => "approval-process",
        }
    }
}

impl Serialize for SupportType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SupportType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "help" | "popup" | "none" => SupportType::Help,
            "split-help" | "ticket" => SupportType::SplitHelp,
            "approval-process" => SupportType::ApprovalProcess,
            other => {
                warn!("⚠️  Unknown support type '{}', falling back to help", other);
                SupportType::Help
            }
        })
    }
}

/// A single link. `url` is the unique key across the catalog and the
/// overlay; uniqueness is case-sensitive exact string match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: BookmarkKind,
    #[serde(default)]
    pub support_type: SupportType,
    #[serde(default)]
    pub is_user_created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<i64>,
}

/// Grouping unit of the catalog. Catalog categories are immutable apart
/// from injected user bookmarks appended at the end; user-created
/// categories are owned by the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    // older user-data generators spell this "colour"
    #[serde(default, alias = "colour")]
    pub color: String,
    #[serde(default)]
    pub is_user_created: bool,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

/// The read-only catalog document supplied by the external loader at
/// startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

/// Everything the user owns: their categories plus bookmarks injected into
/// existing catalog categories, keyed by category id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverlay {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub bookmarks_in_existing_categories: BTreeMap<String, Vec<Bookmark>>,
}

impl UserOverlay {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.bookmarks_in_existing_categories.is_empty()
    }
}

/// Persisted shape of the overlay (`bookmarks-user-data`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataFile {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(flatten)]
    pub overlay: UserOverlay,
}

/// Recency/frequency entry for a bookmark the user has opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub count: u32,
    pub first_visited: i64,
    pub last_visited: i64,
}

/// Millisecond timestamp, the unit used everywhere in persisted state.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Id for a user-created category: timestamp plus random suffix, so rapid
/// repeated imports cannot collide.
pub fn generate_category_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("user-{}-{}", now_millis(), &suffix[..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_type_accepts_legacy_values() {
        let parsed: SupportType = serde_json::from_str("\"ticket\"").unwrap();
        assert_eq!(parsed, SupportType::SplitHelp);
        let parsed: SupportType = serde_json::from_str("\"popup\"").unwrap();
        assert_eq!(parsed, SupportType::Help);
    }

    #[test]
    fn support_type_falls_back_to_help_on_unknown() {
        let parsed: SupportType = serde_json::from_str("\"carrier-pigeon\"").unwrap();
        assert_eq!(parsed, SupportType::Help);
    }

    #[test]
    fn bookmark_defaults_fill_missing_fields() {
        let bookmark: Bookmark =
            serde_json::from_str(r#"{"name":"Lenovo Support","url":"https://support.lenovo.com/"}"#)
                .unwrap();
        assert_eq!(bookmark.kind, BookmarkKind::Web);
        assert_eq!(bookmark.support_type, SupportType::Help);
        assert!(!bookmark.is_user_created);
        assert!(bookmark.tags.is_empty());
    }

    #[test]
    fn category_accepts_colour_alias() {
        let category: Category = serde_json::from_str(
            r##"{"id":"personal","name":"Personal","colour":"#6c757d"}"##,
        )
        .unwrap();
        assert_eq!(category.color, "#6c757d");
    }

    #[test]
    fn generated_category_ids_are_unique() {
        let a = generate_category_id();
        let b = generate_category_id();
        assert_ne!(a, b);
        assert!(a.starts_with("user-"));
    }
}
