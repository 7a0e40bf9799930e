//! Page-aware text chunking.

use crate::document::PageText;
use text_splitter::{ChunkConfig, TextSplitter};

/// A chunk of document text, tagged with the page it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text.
    pub text: String,
    /// 1-based page number.
    pub page: u32,
}

/// Split extracted pages into chunks of at most `max_chars` characters.
///
/// Chunking happens within page boundaries so every chunk carries an exact
/// page number for citation.
#[must_use]
pub fn chunk_pages(pages: &[PageText], max_chars: usize) -> Vec<Chunk> {
    let splitter = TextSplitter::new(ChunkConfig::new(max_chars));

    let mut chunks = Vec::new();
    for page in pages {
        chunks.extend(splitter.chunks(&page.text).map(|text| Chunk {
            text: text.to_string(),
            page: page.number,
        }));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_short_page_is_one_chunk() {
        let pages = vec![page(1, "Refunds are issued within 30 days.")];
        let chunks = chunk_pages(&pages, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].text, "Refunds are issued within 30 days.");
    }

    #[test]
    fn test_long_page_splits_within_limit() {
        let text = "A sentence about policy. ".repeat(40);
        let pages = vec![page(3, &text)];
        let chunks = chunk_pages(&pages, 100);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.len() <= 100));
        assert!(chunks.iter().all(|c| c.page == 3));
    }

    #[test]
    fn test_chunks_do_not_cross_pages() {
        let pages = vec![page(1, "First page body."), page(2, "Second page body.")];
        let chunks = chunk_pages(&pages, 1000);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[1].page, 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_pages(&[], 100).is_empty());
    }
}
