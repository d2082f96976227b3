//! Frequency + recency tracking for opened bookmarks.

use crate::model::{Bookmark, VisitRecord};

/// At most this many entries survive a visit.
pub const RECENT_VISITS_CAP: usize = 8;
/// Settings import merges against a larger window before re-capping.
pub const IMPORT_MERGE_CAP: usize = 15;

const THIRTY_DAYS_MS: i64 = 30 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentVisits {
    entries: Vec<VisitRecord>,
}

impl RecentVisits {
    /// Rehydrate from storage, pruning entries older than 30 days.
    pub fn from_entries(entries: Vec<VisitRecord>, now: i64) -> Self {
        let cutoff = now - THIRTY_DAYS_MS;
        Self {
            entries: entries
                .into_iter()
                .filter(|v| v.last_visited > cutoff)
                .collect(),
        }
    }

    pub fn entries(&self) -> &[VisitRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record one visit. Existing urls bump their count and recency; new
    /// urls enter at the front. The list is then capped at 8 and kept
    /// sorted most-recent-first.
    pub fn track(&mut self, bookmark: &Bookmark, now: i64) {
        if let Some(existing) = self.entries.iter_mut().find(|v| v.url == bookmark.url) {
            existing.count += 1;
            existing.last_visited = now;
        } else {
            self.entries.insert(
                0,
                VisitRecord {
                    url: bookmark.url.clone(),
                    name: bookmark.name.clone(),
                    description: bookmark.description.clone(),
                    count: 1,
                    first_visited: now,
                    last_visited: now,
                },
            );
        }

        self.entries.truncate(RECENT_VISITS_CAP);
        self.entries.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
    }

    /// Settings-import merge: by url, the later `last_visited` wins; the
    /// result is re-sorted descending and capped at 15.
    pub fn merge_imported(&mut self, imported: &[VisitRecord]) {
        for incoming in imported {
            match self.entries.iter_mut().find(|v| v.url == incoming.url) {
                Some(existing) => {
                    if incoming.last_visited > existing.last_visited {
                        *existing = incoming.clone();
                    }
                }
                None => self.entries.push(incoming.clone()),
            }
        }
        self.entries.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
        self.entries.truncate(IMPORT_MERGE_CAP);
    }
}
