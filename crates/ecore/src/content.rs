//! The entity content blob.
//!
//! Source systems treat content as `string | object | array | bytes`; this
//! crate fixes it to three variants. The content-type tag
//! (`content:type:*`) is authoritative — HTTP-boundary conversion between
//! these variants and a client-facing JSON body happens outside this crate.

use serde::{Deserialize, Serialize};

/// Entity content, resolved to one of three concrete shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Content {
    /// UTF-8 text.
    Text(String),
    /// A JSON document, stored pre-serialized.
    Json(Vec<u8>),
    /// Arbitrary binary data.
    Binary(Vec<u8>),
}

impl Content {
    /// Borrow the underlying bytes regardless of variant.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(s) => s.as_bytes(),
            Content::Json(b) | Content::Binary(b) => b,
        }
    }

    /// Number of bytes this content occupies on disk.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// True if this content is empty (as for a chunked parent).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into a raw byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Text(s) => s.into_bytes(),
            Content::Json(b) | Content::Binary(b) => b,
        }
    }

    /// Build raw binary content from bytes and no declared type.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Content::Binary(bytes.into())
    }

    /// The `content:type:*` tag value implied by this variant, used when
    /// the caller does not already supply an explicit content-type tag.
    pub fn default_type_tag(&self) -> &'static str {
        match self {
            Content::Text(_) => "content:type:text/plain",
            Content::Json(_) => "content:type:application/json",
            Content::Binary(_) => "content:type:application/octet-stream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_as_bytes_matches_utf8() {
        let c = Content::Text("hello".to_string());
        assert_eq!(c.as_bytes(), b"hello");
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn empty_binary_is_empty() {
        let c = Content::binary(Vec::new());
        assert!(c.is_empty());
    }

    #[test]
    fn default_type_tags_match_variant() {
        assert_eq!(
            Content::Text(String::new()).default_type_tag(),
            "content:type:text/plain"
        );
        assert_eq!(
            Content::Json(Vec::new()).default_type_tag(),
            "content:type:application/json"
        );
        assert_eq!(
            Content::Binary(Vec::new()).default_type_tag(),
            "content:type:application/octet-stream"
        );
    }
}
