//! Tag index: exact lookup plus a namespace sub-map for wildcard/prefix and
//! "list by namespace" queries.
//!
//! A `HashMap<K, HashSet<Id>>` with insert/remove-that-cleans-up-empty-sets,
//! generalized into a two-level structure: one flat map for exact tag text,
//! one namespace -> value -> ids map for everything else.

use edb_core::{EntityId, Tag};
use std::collections::{BTreeMap, HashMap, HashSet};

/// In-memory inverted index from tag text to the entities that currently
/// carry it.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    exact: HashMap<String, HashSet<EntityId>>,
    namespaces: HashMap<String, BTreeMap<String, HashSet<EntityId>>>,
}

impl TagIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` carries `tag`.
    pub fn insert(&mut self, tag: &Tag, id: EntityId) {
        self.exact.entry(tag.text.clone()).or_default().insert(id);
        self.namespaces
            .entry(tag.namespace().to_string())
            .or_default()
            .entry(tag.value().to_string())
            .or_default()
            .insert(id);
    }

    /// Remove the association between `id` and `tag_text`, cleaning up any
    /// sets (and namespace entries) left empty, so a namespace with no
    /// remaining tags simply disappears from `list_by_namespace` results.
    pub fn remove(&mut self, tag_text: &str, id: &EntityId) {
        if let Some(set) = self.exact.get_mut(tag_text) {
            set.remove(id);
            if set.is_empty() {
                self.exact.remove(tag_text);
            }
        }

        let (ns, value) = split_namespace(tag_text);
        if let Some(submap) = self.namespaces.get_mut(ns) {
            if let Some(set) = submap.get_mut(value) {
                set.remove(id);
                if set.is_empty() {
                    submap.remove(value);
                }
            }
            if submap.is_empty() {
                self.namespaces.remove(ns);
            }
        }
    }

    /// Entities carrying `tag_text` exactly.
    pub fn lookup_exact(&self, tag_text: &str) -> HashSet<EntityId> {
        self.exact.get(tag_text).cloned().unwrap_or_default()
    }

    /// Entities matching a wildcard pattern: `namespace:*` (any value in the
    /// namespace) or `namespace:prefix*` (value has the given prefix).
    ///
    /// Patterns without a trailing `*` fall back to an exact match.
    pub fn lookup_wildcard(&self, pattern: &str) -> HashSet<EntityId> {
        let Some(prefix) = pattern.strip_suffix('*') else {
            return self.lookup_exact(pattern);
        };
        let (ns, value_prefix) = split_namespace(prefix);

        let Some(submap) = self.namespaces.get(ns) else {
            return HashSet::new();
        };
        submap
            .range(value_prefix.to_string()..)
            .take_while(|(value, _)| value.starts_with(value_prefix))
            .flat_map(|(_, set)| set.iter().copied())
            .collect()
    }

    /// Every entity carrying any tag in `namespace`.
    pub fn lookup_namespace(&self, namespace: &str) -> HashSet<EntityId> {
        self.namespaces
            .get(namespace)
            .map(|submap| submap.values().flat_map(|set| set.iter().copied()).collect())
            .unwrap_or_default()
    }

    /// Number of distinct tag texts currently indexed.
    pub fn distinct_tag_count(&self) -> usize {
        self.exact.len()
    }
}

/// Split `text` into `(namespace, value)` at the first colon, matching
/// [`edb_core::Tag::namespace`]/[`edb_core::Tag::value`].
fn split_namespace(text: &str) -> (&str, &str) {
    match text.find(':') {
        Some(i) => (&text[..i], &text[i + 1..]),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_lookup_finds_inserted_tag() {
        let mut idx = TagIndex::new();
        let id = EntityId::new();
        idx.insert(&Tag::new(1, "type:doc"), id);
        assert_eq!(idx.lookup_exact("type:doc"), HashSet::from([id]));
    }

    #[test]
    fn namespace_wildcard_matches_any_value() {
        let mut idx = TagIndex::new();
        let a = EntityId::new();
        let b = EntityId::new();
        idx.insert(&Tag::new(1, "status:draft"), a);
        idx.insert(&Tag::new(2, "status:published"), b);
        let result = idx.lookup_wildcard("status:*");
        assert_eq!(result, HashSet::from([a, b]));
    }

    #[test]
    fn prefix_wildcard_matches_value_prefix_only() {
        let mut idx = TagIndex::new();
        let a = EntityId::new();
        let b = EntityId::new();
        idx.insert(&Tag::new(1, "content:type:text/plain"), a);
        idx.insert(&Tag::new(2, "content:type:application/json"), b);
        let result = idx.lookup_wildcard("content:type:text*");
        assert_eq!(result, HashSet::from([a]));
    }

    #[test]
    fn lookup_namespace_unions_all_values() {
        let mut idx = TagIndex::new();
        let a = EntityId::new();
        let b = EntityId::new();
        idx.insert(&Tag::new(1, "status:draft"), a);
        idx.insert(&Tag::new(2, "status:published"), b);
        assert_eq!(idx.lookup_namespace("status"), HashSet::from([a, b]));
    }

    #[test]
    fn remove_cleans_up_empty_sets_and_namespaces() {
        let mut idx = TagIndex::new();
        let a = EntityId::new();
        idx.insert(&Tag::new(1, "status:draft"), a);
        idx.remove("status:draft", &a);
        assert!(idx.lookup_exact("status:draft").is_empty());
        assert!(idx.lookup_namespace("status").is_empty());
    }

    #[test]
    fn unrelated_namespace_untouched_by_removal() {
        let mut idx = TagIndex::new();
        let a = EntityId::new();
        idx.insert(&Tag::new(1, "status:draft"), a);
        idx.insert(&Tag::new(1, "type:doc"), a);
        idx.remove("status:draft", &a);
        assert_eq!(idx.lookup_exact("type:doc"), HashSet::from([a]));
    }

    #[test]
    fn pattern_without_star_is_exact() {
        let mut idx = TagIndex::new();
        let a = EntityId::new();
        idx.insert(&Tag::new(1, "type:doc"), a);
        assert_eq!(idx.lookup_wildcard("type:doc"), HashSet::from([a]));
        assert!(idx.lookup_wildcard("type:docx").is_empty());
    }
}
