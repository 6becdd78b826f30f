use std::sync::LazyLock;

use regex::Regex;

use super::{is_stop_word, lemmatize};

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("valid bracket pattern"));
static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*?\)").expect("valid parenthesis pattern"));
static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}\b").expect("valid timestamp pattern"));
static NON_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z\s]").expect("valid letter pattern"));

/// Turns a raw utterance into a lowercase, stop-word-free, lemmatized string.
#[derive(Debug, Clone, Copy)]
pub struct TextNormalizer {
    remove_stop_words: bool,
    lemmatize: bool,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            remove_stop_words: true,
            lemmatize: true,
        }
    }

    pub fn with_stop_words_removed(mut self, enabled: bool) -> Self {
        self.remove_stop_words = enabled;
        self
    }

    pub fn with_lemmatization(mut self, enabled: bool) -> Self {
        self.lemmatize = enabled;
        self
    }

    /// Drops `[..]`/`(..)` annotations, timestamps and anything but letters.
    pub fn clean(&self, text: &str) -> String {
        let text = BRACKETED.replace_all(text, "");
        let text = PARENTHESIZED.replace_all(&text, "");
        let text = TIMESTAMP.replace_all(&text, "");
        let text = NON_LETTER.replace_all(&text, "");
        text.trim().to_string()
    }

    pub fn normalize(&self, text: &str) -> String {
        text.to_lowercase()
            .split_whitespace()
            .filter(|token| !(self.remove_stop_words && is_stop_word(token)))
            .map(|token| {
                if self.lemmatize {
                    lemmatize(token)
                } else {
                    token.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn preprocess(&self, text: &str) -> String {
        self.normalize(&self.clean(text))
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_annotations_and_timestamps() {
        let n = TextNormalizer::new();
        assert_eq!(n.clean("[user1] hello (laughs) at 10:45!"), "hello  at");
    }

    #[test]
    fn test_preprocess() {
        let n = TextNormalizer::new();
        assert_eq!(n.preprocess("I love my two cats!"), "love two cat");
        assert_eq!(n.preprocess("Hi"), "hi");
    }

    #[test]
    fn test_only_stop_words_normalize_to_empty() {
        let n = TextNormalizer::new();
        assert_eq!(n.preprocess("I am here, and you?"), "");
    }

    #[test]
    fn test_toggles() {
        let n = TextNormalizer::new()
            .with_stop_words_removed(false)
            .with_lemmatization(false);
        assert_eq!(n.preprocess("The Cats"), "the cats");
    }
}
