//! Produces the display-ready working catalog from the read-only catalog
//! plus the user overlay.
//!
//! The merge is idempotent: user-created entries are stripped first, so
//! feeding a previous merge result back in with the same overlay yields a
//! structurally identical catalog.

use crate::model::{Catalog, UserOverlay};

/// Build a fresh working catalog. Inputs are never mutated.
///
/// Order is preserved throughout: catalog categories keep their positions,
/// injected bookmarks are appended after existing ones in overlay array
/// order, and user categories are appended at the end in overlay order.
pub fn merge(catalog: &Catalog, overlay: &UserOverlay) -> Catalog {
    let mut working = catalog.clone();

    // Undo any earlier merge before layering the overlay back on.
    for category in &mut working.categories {
        category.bookmarks.retain(|b| !b.is_user_created);
    }
    working.categories.retain(|c| !c.is_user_created);

    for category in &mut working.categories {
        if let Some(injected) = overlay.bookmarks_in_existing_categories.get(&category.id) {
            category.bookmarks.extend(injected.iter().cloned());
        }
    }

    working
        .categories
        .extend(overlay.categories.iter().cloned());

    working
}
