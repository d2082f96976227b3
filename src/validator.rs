//! Integrity checks over the merged catalog.

use std::collections::HashMap;

use crate::store::BookmarkStore;

pub struct IntegrityReport {
    categories: usize,
    bookmarks: usize,
    user_categories: usize,
    injected_bookmarks: usize,
    duplicate_urls: Vec<(String, usize)>,
    dangling_category_ids: Vec<String>,
}

/// Walk the working catalog and the overlay, collecting duplicate urls
/// (rename-imported bookmarks show up here) and injected lists whose
/// category id no longer exists in the catalog.
pub fn check(store: &BookmarkStore) -> IntegrityReport {
    let working = store.working_catalog();

    let mut url_counts: HashMap<String, usize> = HashMap::new();
    let mut bookmarks = 0;
    for category in &working.categories {
        for bookmark in &category.bookmarks {
            bookmarks += 1;
            *url_counts.entry(bookmark.url.clone()).or_insert(0) += 1;
        }
    }

    let mut duplicate_urls: Vec<(String, usize)> = url_counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    duplicate_urls.sort();

    let dangling_category_ids: Vec<String> = store
        .overlay()
        .bookmarks_in_existing_categories
        .keys()
        .filter(|id| !store.catalog().categories.iter().any(|c| &c.id == *id))
        .cloned()
        .collect();

    IntegrityReport {
        categories: working.categories.len(),
        bookmarks,
        user_categories: store.overlay().categories.len(),
        injected_bookmarks: store
            .overlay()
            .bookmarks_in_existing_categories
            .values()
            .map(|b| b.len())
            .sum(),
        duplicate_urls,
        dangling_category_ids,
    }
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_urls.is_empty() && self.dangling_category_ids.is_empty()
    }

    pub fn format(&self, detailed: bool) -> String {
        let mut output = String::new();

        output.push_str("\n🔍 Catalog Integrity Report\n");
        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

        output.push_str("📖 Working Catalog:\n");
        output.push_str(&format!(
            "  • {} categories, {} bookmarks\n",
            self.categories, self.bookmarks
        ));
        output.push_str(&format!(
            "  • {} user categories, {} injected bookmarks\n\n",
            self.user_categories, self.injected_bookmarks
        ));

        if !self.duplicate_urls.is_empty() {
            output.push_str("⚠️  Duplicate URLs:\n");
            for (url, count) in &self.duplicate_urls {
                output.push_str(&format!("  • {url} ({count}x)\n"));
            }
            if detailed {
                output.push_str("    Duplicates usually come from bookmark imports under the\n");
                output.push_str("    'rename' policy, which keeps the original url.\n");
            }
            output.push('\n');
        }

        if !self.dangling_category_ids.is_empty() {
            output.push_str("⚠️  Unreachable injected bookmarks:\n");
            for id in &self.dangling_category_ids {
                output.push_str(&format!("  • category id '{id}' is not in the catalog\n"));
            }
            if detailed {
                output.push_str("    These bookmarks never appear in the merged view until a\n");
                output.push_str("    catalog category with that id returns.\n");
            }
            output.push('\n');
        }

        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        if self.is_clean() {
            output.push_str("\n✅ No integrity issues found\n");
        } else {
            output.push_str(&format!(
                "\n📊 Summary: {} duplicate urls, {} unreachable injection lists\n",
                self.duplicate_urls.len(),
                self.dangling_category_ids.len()
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Catalog, UserOverlay};

    fn store_with(overlay_json: &str) -> BookmarkStore {
        let catalog: Catalog = serde_json::from_str(
            r##"{"categories": [{"id": "hardware", "name": "Hardware", "color": "#111111",
                "bookmarks": [{"name": "Lenovo Support", "url": "https://support.lenovo.com/"}]}]}"##,
        )
        .unwrap();
        let overlay: UserOverlay = serde_json::from_str(overlay_json).unwrap();
        BookmarkStore::new(catalog, overlay)
    }

    #[test]
    fn clean_store_reports_clean() {
        let store = store_with(r#"{"categories": [], "bookmarksInExistingCategories": {}}"#);
        let report = check(&store);
        assert!(report.is_clean());
        assert!(report.format(false).contains("No integrity issues"));
    }

    #[test]
    fn duplicate_urls_are_reported() {
        let store = store_with(
            r#"{"categories": [], "bookmarksInExistingCategories": {
                "hardware": [{"name": "Lenovo (Imported)", "url": "https://support.lenovo.com/"}]
            }}"#,
        );
        let report = check(&store);
        assert!(!report.is_clean());
        assert!(report.format(false).contains("https://support.lenovo.com/ (2x)"));
    }

    #[test]
    fn dangling_injection_keys_are_reported() {
        let store = store_with(
            r#"{"categories": [], "bookmarksInExistingCategories": {
                "retired-category": [{"name": "Old", "url": "https://old.example"}]
            }}"#,
        );
        let report = check(&store);
        assert!(!report.is_clean());
        assert!(report.format(true).contains("retired-category"));
    }
}
