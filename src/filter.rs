//! Search and tag visibility rules.
//!
//! The same rules apply to catalog bookmarks, favorites and visit records,
//! so the engine works against a small trait rather than any one type.

use crate::model::{Bookmark, VisitRecord};
use std::collections::BTreeSet;

/// Anything the filters can look at.
pub trait FilterTarget {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn url(&self) -> &str;
    fn tags(&self) -> &[String];
}

impl FilterTarget for Bookmark {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn url(&self) -> &str {
        &self.url
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl FilterTarget for VisitRecord {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn url(&self) -> &str {
        &self.url
    }
    // visit records carry no tags; they only match when no tag filter is active
    fn tags(&self) -> &[String] {
        &[]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    search_term: String,
    pub active_tags: BTreeSet<String>,
}

impl FilterState {
    pub fn new(term: &str, active_tags: BTreeSet<String>) -> Self {
        Self {
            search_term: term.to_lowercase(),
            active_tags,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.search_term.is_empty() || !self.active_tags.is_empty()
    }

    /// Case-insensitive substring match over name, description, url and
    /// tags joined by single spaces. An empty term matches everything.
    pub fn matches_search<T: FilterTarget>(&self, item: &T) -> bool {
        if self.search_term.is_empty() {
            return true;
        }
        let mut haystack = String::with_capacity(
            item.name().len() + item.description().len() + item.url().len() + 16,
        );
        haystack.push_str(item.name());
        haystack.push(' ');
        haystack.push_str(item.description());
        haystack.push(' ');
        haystack.push_str(item.url());
        for tag in item.tags() {
            haystack.push(' ');
            haystack.push_str(tag);
        }
        haystack.to_lowercase().contains(&self.search_term)
    }

    /// OR semantics: the item matches when it carries at least one of the
    /// active tags. An empty tag set matches everything.
    pub fn matches_tags<T: FilterTarget>(&self, item: &T) -> bool {
        self.active_tags.is_empty() || item.tags().iter().any(|t| self.active_tags.contains(t))
    }

    pub fn is_visible<T: FilterTarget>(&self, item: &T) -> bool {
        self.matches_search(item) && self.matches_tags(item)
    }
}

/// Visibility summary for one rendered section (a category, favorites, or
/// recent visits).
#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub visible: Vec<bool>,
    pub visible_count: usize,
    pub total: usize,
    pub hidden: bool,
    pub badge: usize,
}

pub fn section_view<T: FilterTarget>(filter: &FilterState, items: &[T]) -> SectionView {
    let visible: Vec<bool> = items.iter().map(|i| filter.is_visible(i)).collect();
    let visible_count = visible.iter().filter(|v| **v).count();
    let total = items.len();
    // a populated section collapses when filtering leaves nothing visible
    let hidden = total >= 1 && visible_count == 0 && filter.is_active();
    let badge = if filter.is_active() { visible_count } else { total };
    SectionView {
        visible,
        visible_count,
        total,
        hidden,
        badge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bookmark;

    fn bookmark(name: &str, tags: &[&str]) -> Bookmark {
        Bookmark {
            name: name.to_string(),
            url: format!("https://{}.example", name.to_lowercase().replace(' ', "-")),
            description: format!("{name} support portal"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            logo: None,
            kind: Default::default(),
            support_type: Default::default(),
            is_user_created: false,
            date_added: None,
        }
    }

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = FilterState::default();
        assert!(filter.is_visible(&bookmark("Lenovo Support", &["hardware"])));
        assert!(!filter.is_active());
    }

    #[test]
    fn search_is_case_insensitive() {
        let item = bookmark("Lenovo Support", &[]);
        let upper = FilterState::new("LENOVO", BTreeSet::new());
        let lower = FilterState::new("lenovo", BTreeSet::new());
        assert_eq!(upper.matches_search(&item), lower.matches_search(&item));
        assert!(upper.matches_search(&item));
    }

    #[test]
    fn search_covers_description_url_and_tags() {
        let item = bookmark("Dell", &["warranty"]);
        assert!(FilterState::new("portal", BTreeSet::new()).matches_search(&item));
        assert!(FilterState::new("dell.example", BTreeSet::new()).matches_search(&item));
        assert!(FilterState::new("warranty", BTreeSet::new()).matches_search(&item));
        assert!(!FilterState::new("printer", BTreeSet::new()).matches_search(&item));
    }

    #[test]
    fn tag_match_uses_or_semantics() {
        let filter = FilterState::new("", tags(&["a", "b"]));
        assert!(filter.matches_tags(&bookmark("X", &["b"])));
        assert!(!filter.matches_tags(&bookmark("Y", &["c"])));
        assert!(FilterState::default().matches_tags(&bookmark("Z", &["c"])));
    }

    #[test]
    fn visit_records_fail_tag_filters() {
        let visit = VisitRecord {
            url: "https://x".to_string(),
            name: "X".to_string(),
            description: String::new(),
            count: 1,
            first_visited: 0,
            last_visited: 0,
        };
        assert!(FilterState::default().is_visible(&visit));
        assert!(!FilterState::new("", tags(&["a"])).is_visible(&visit));
    }

    #[test]
    fn section_hides_only_under_active_filter() {
        let items = vec![bookmark("Lenovo Support", &[]), bookmark("Dell", &[])];

        let unfiltered = section_view(&FilterState::default(), &items);
        assert!(!unfiltered.hidden);
        assert_eq!(unfiltered.badge, 2);

        let filtered = section_view(&FilterState::new("printer", BTreeSet::new()), &items);
        assert!(filtered.hidden);
        assert_eq!(filtered.badge, 0);

        let partial = section_view(&FilterState::new("lenovo", BTreeSet::new()), &items);
        assert!(!partial.hidden);
        assert_eq!(partial.badge, 1);
        assert_eq!(partial.visible, vec![true, false]);
    }

    #[test]
    fn empty_section_is_never_hidden() {
        let items: Vec<Bookmark> = vec![];
        let view = section_view(&FilterState::new("anything", BTreeSet::new()), &items);
        assert!(!view.hidden);
    }
}
