//! Whitespace tokenization
//!
//! A book's text is tokenized once when a playback session opens and the
//! resulting sequence is shared read-only with the session task. Tokens
//! are maximal runs of non-whitespace, so punctuation stays attached to
//! its word and the count is stable across repeated tokenizations of the
//! same text.

use std::sync::Arc;

/// Immutable, indexable sequence of display tokens for one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSequence {
    words: Vec<String>,
}

impl WordSequence {
    pub fn new(text: &str) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn shared(text: &str) -> Arc<Self> {
        Arc::new(Self::new(text))
    }

    /// Total number of tokens.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Token at `index`, if it exists.
    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Tokens in `[start, end)`, both bounds clamped to the sequence.
    pub fn slice(&self, start: usize, end: usize) -> &[String] {
        let end = end.min(self.words.len());
        let start = start.min(end);
        &self.words[start..end]
    }

    /// Space-joined tokens in `[start, end)`, clamped.
    pub fn phrase(&self, start: usize, end: usize) -> String {
        self.slice(start, end).join(" ")
    }
}

/// Word count as playback sees it: the token count of `text`.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_any_whitespace() {
        let seq = WordSequence::new("The quick\tbrown\n\nfox");
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.word(0), Some("The"));
        assert_eq!(seq.word(3), Some("fox"));
        assert_eq!(seq.word(4), None);
    }

    #[test]
    fn test_punctuation_stays_attached() {
        let seq = WordSequence::new("Hello, world! It's fine.");
        assert_eq!(seq.word(0), Some("Hello,"));
        assert_eq!(seq.word(1), Some("world!"));
        assert_eq!(seq.word(2), Some("It's"));
    }

    #[test]
    fn test_empty_and_blank_text() {
        assert!(WordSequence::new("").is_empty());
        assert!(WordSequence::new("   \n\t  ").is_empty());
        assert_eq!(count_words("  \n "), 0);
    }

    #[test]
    fn test_phrase_clamps_to_end() {
        let seq = WordSequence::new("one two three");
        assert_eq!(seq.phrase(1, 5), "two three");
        assert_eq!(seq.phrase(3, 6), "");
        assert_eq!(seq.slice(2, 2).len(), 0);
    }

    #[test]
    fn test_count_matches_sequence_len() {
        let text = "A  double  spaced   line\nwith breaks";
        assert_eq!(count_words(text), WordSequence::new(text).len());
    }
}
