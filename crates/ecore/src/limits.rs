//! Chunking thresholds and other size limits.
//!
//! Frozen defaults after stabilization, overridable at repository-open time.

/// Size thresholds governing content chunking and tag validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Content at or above this size is chunked on write. Default: 4 MiB.
    pub auto_chunk_threshold: usize,
    /// Size of each chunk child's content. Default: 1 MiB.
    pub default_chunk_size: usize,
    /// Maximum length of a single tag's text. Default: 4 KiB.
    pub max_tag_text_bytes: usize,
    /// Maximum number of tags on one entity. Default: 1,000,000.
    pub max_tags_per_entity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            auto_chunk_threshold: 4 * 1024 * 1024,
            default_chunk_size: 1024 * 1024,
            max_tag_text_bytes: 4 * 1024,
            max_tags_per_entity: 1_000_000,
        }
    }
}

impl Limits {
    /// Small thresholds for tests that want to exercise chunking without
    /// allocating megabytes of fixture data.
    pub fn with_small_limits() -> Self {
        Self {
            auto_chunk_threshold: 64,
            default_chunk_size: 16,
            max_tag_text_bytes: 256,
            max_tags_per_entity: 1000,
        }
    }

    /// Number of chunks `content_len` bytes would be split into.
    pub fn chunk_count(&self, content_len: usize) -> u32 {
        content_len.div_ceil(self.default_chunk_size) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_spec() {
        let l = Limits::default();
        assert_eq!(l.auto_chunk_threshold, 4 * 1024 * 1024);
        assert_eq!(l.default_chunk_size, 1024 * 1024);
    }

    #[test]
    fn chunk_count_rounds_up() {
        let l = Limits::with_small_limits();
        assert_eq!(l.chunk_count(32), 2);
        assert_eq!(l.chunk_count(33), 3);
        assert_eq!(l.chunk_count(0), 0);
    }
}
