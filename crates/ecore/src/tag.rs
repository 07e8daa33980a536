//! Temporal tags: the atomic unit of an entity's history.

use serde::{Deserialize, Serialize};

/// A temporal tag: a nanosecond timestamp paired with `namespace:value` text.
///
/// Colons are the only reserved separator; the value portion may itself
/// contain colons (`namespace:sub:value`). Ties on `t_ns` within one
/// entity's tag list break by insertion order — the skiplist in
/// `edb-index` preserves this by never reordering equal-timestamp entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Nanosecond epoch timestamp this tag was written.
    pub t_ns: i64,
    /// `namespace:value` (or `namespace:sub:value`) text.
    pub text: String,
}

impl Tag {
    /// Construct a tag stamped with the given timestamp.
    pub fn new(t_ns: i64, text: impl Into<String>) -> Self {
        Self {
            t_ns,
            text: text.into(),
        }
    }

    /// The namespace: everything before the first `:`.
    ///
    /// A tag with no `:` has its entire text as namespace and an empty value.
    pub fn namespace(&self) -> &str {
        match self.text.find(':') {
            Some(i) => &self.text[..i],
            None => &self.text,
        }
    }

    /// The value: everything after the first `:`, or empty if there is none.
    pub fn value(&self) -> &str {
        match self.text.find(':') {
            Some(i) => &self.text[i + 1..],
            None => "",
        }
    }

    /// Does this tag's text match a wildcard pattern like `status:*` or
    /// `content:type:prefix*`?
    ///
    /// Only a single trailing `*` is supported (no grammar is given
    /// beyond `ns:*` and `ns:prefix*`); `*` elsewhere in the pattern is
    /// treated as a literal character.
    pub fn matches_wildcard(&self, pattern: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => self.text.starts_with(prefix),
            None => self.text == pattern,
        }
    }
}

/// Strip the timestamp from a tag list, keeping only `text`, for the
/// "stripped" back-compat read view clients may request.
pub fn strip_timestamps(tags: &[Tag]) -> Vec<String> {
    tags.iter().map(|t| t.text.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_and_value_split_on_first_colon() {
        let tag = Tag::new(1, "content:type:text/plain");
        assert_eq!(tag.namespace(), "content");
        assert_eq!(tag.value(), "type:text/plain");
    }

    #[test]
    fn namespace_without_colon_is_whole_text() {
        let tag = Tag::new(1, "standalone");
        assert_eq!(tag.namespace(), "standalone");
        assert_eq!(tag.value(), "");
    }

    #[test]
    fn wildcard_star_matches_namespace_prefix() {
        let tag = Tag::new(1, "status:draft");
        assert!(tag.matches_wildcard("status:*"));
        assert!(!tag.matches_wildcard("other:*"));
    }

    #[test]
    fn wildcard_prefix_star_matches_value_prefix() {
        let tag = Tag::new(1, "content:type:text/plain");
        assert!(tag.matches_wildcard("content:type:text*"));
        assert!(!tag.matches_wildcard("content:type:json*"));
    }

    #[test]
    fn exact_pattern_without_star_requires_equality() {
        let tag = Tag::new(1, "type:doc");
        assert!(tag.matches_wildcard("type:doc"));
        assert!(!tag.matches_wildcard("type:document"));
    }

    #[test]
    fn strip_timestamps_drops_t_ns() {
        let tags = vec![Tag::new(1, "a:b"), Tag::new(2, "c:d")];
        assert_eq!(strip_timestamps(&tags), vec!["a:b".to_string(), "c:d".to_string()]);
    }
}
