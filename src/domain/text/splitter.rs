use std::collections::VecDeque;

const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Recursive character splitter.
///
/// Text is cut on the coarsest separator it contains; pieces still longer than
/// `chunk_size` are cut again with the next finer separator. Pieces are then
/// merged back into chunks of at most `chunk_size` characters, where each
/// chunk repeats up to `chunk_overlap` characters from the end of the previous
/// one. Lengths are counted in chars.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let index = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(index).copied().unwrap_or("");
        let finer = separators.get(index + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_with(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }

        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            let joined_len = |current: &VecDeque<(&str, usize)>| {
                if current.is_empty() {
                    0
                } else {
                    sep_len
                }
            };

            if !current.is_empty() && total + len + joined_len(&current) > self.chunk_size {
                push_joined(&mut chunks, &current, separator);

                while total > self.chunk_overlap
                    || (total > 0 && total + len + joined_len(&current) > self.chunk_size)
                {
                    let removed_sep = if current.len() > 1 { sep_len } else { 0 };
                    match current.pop_front() {
                        Some((_, first_len)) => total -= first_len + removed_sep,
                        None => break,
                    }
                }
            }

            current.push_back((piece, len));
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(1000, 100)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, current: &VecDeque<(&str, usize)>, separator: &str) {
    let joined = current
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split("Question: hi\nAnswer: hello");
        assert_eq!(chunks, vec!["Question: hi\nAnswer: hello"]);
    }

    #[test]
    fn test_overlap_carries_previous_words() {
        let splitter = TextSplitter::new(3, 1);
        let chunks = splitter.split("a b c d e f");
        assert_eq!(chunks, vec!["a b", "b c", "c d", "d e", "e f"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "lorem ipsum dolor sit amet ".repeat(200);
        let splitter = TextSplitter::new(1000, 100);
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = (0..400).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let splitter = TextSplitter::new(100, 20);
        let chunks = splitter.split(&text);

        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap_or_default();
            assert!(pair[1].contains(last_word));
        }
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let splitter = TextSplitter::new(4, 0);
        let chunks = splitter.split("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_paragraphs_preferred_over_lines() {
        let splitter = TextSplitter::new(12, 0);
        let chunks = splitter.split("first para\n\nsecond one");
        assert_eq!(chunks, vec!["first para", "second one"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(TextSplitter::default().split("").is_empty());
    }
}
