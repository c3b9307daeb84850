/// Splits text into overlapping chunks measured in characters.
///
/// A chunk ends at the last whitespace in the second half of its window
/// when there is one, so words are rarely cut in two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub const DEFAULT_CHUNK_SIZE: usize = 1000;
    pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

    /// Sizes are clamped so that `chunk_size >= 1` and
    /// `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let mut end = (start + self.chunk_size).min(total);
            if end < total {
                if let Some(cut) = self.break_point(text, &bounds, start, end) {
                    end = cut;
                }
            }

            let chunk = text[bounds[start]..bounds[end]].trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end >= total {
                break;
            }

            let next = end.saturating_sub(self.chunk_overlap);
            start = if next > start { next } else { end };
        }
        chunks
    }

    fn break_point(&self, text: &str, bounds: &[usize], start: usize, end: usize) -> Option<usize> {
        let floor = (start + self.chunk_size / 2).max(start + 1);
        (floor..end)
            .rev()
            .find(|&i| text[bounds[i]..bounds[i + 1]].chars().all(char::is_whitespace))
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHUNK_SIZE, Self::DEFAULT_CHUNK_OVERLAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::default();
        assert_eq!(chunker.split("  Hello world \n"), vec!["Hello world"]);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(TextChunker::default().split(" \n\t ").is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let chunker = TextChunker::new(20, 5);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda";
        let chunks = chunker.split(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "chunk too long: {:?}", chunk);
        }
        for word in text.split_whitespace() {
            assert!(
                chunks.iter().any(|c| c.contains(word)),
                "word {} lost",
                word
            );
        }
        // Words are not cut at chunk ends.
        for chunk in &chunks[..chunks.len() - 1] {
            let last = chunk.split_whitespace().last().unwrap();
            assert!(text.split_whitespace().any(|w| w == last));
        }
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let chunker = TextChunker::new(4, 1);
        let chunks = chunker.split("äöüßäöüßäöüß");
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let chunker = TextChunker::new(3, 10);
        assert_eq!(chunker.chunk_overlap(), 2);
        // Must still terminate.
        assert!(!chunker.split("abcdefghij").is_empty());
    }
}
