use serde::{Deserialize, Serialize};

/// One `(input, response)` example taken from two adjacent utterances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPair {
    pub input: String,
    pub response: String,
}

impl ConversationPair {
    pub fn new(input: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            response: response.into(),
        }
    }

    pub fn to_document_text(&self) -> String {
        format!("Question: {}\nAnswer: {}", self.input, self.response)
    }
}

/// Pairs every utterance with the one that follows it.
pub fn training_pairs<S: AsRef<str>>(dialog: &[S]) -> Vec<ConversationPair> {
    dialog
        .windows(2)
        .map(|w| ConversationPair::new(w[0].as_ref(), w[1].as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_utterances_become_pairs() {
        let pairs = training_pairs(&["Hi", "Hello", "Bye"]);

        assert_eq!(
            pairs,
            vec![
                ConversationPair::new("Hi", "Hello"),
                ConversationPair::new("Hello", "Bye"),
            ]
        );
    }

    #[test]
    fn test_short_dialogs_yield_nothing() {
        assert!(training_pairs::<&str>(&[]).is_empty());
        assert!(training_pairs(&["alone"]).is_empty());
    }

    #[test]
    fn test_document_text() {
        let pair = ConversationPair::new("how are you", "fine");
        assert_eq!(pair.to_document_text(), "Question: how are you\nAnswer: fine");
    }
}
