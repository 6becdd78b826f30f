use std::path::Path;

use tracing::{info, instrument};

use crate::domain::{training_pairs, ConversationPair, DomainError, TextNormalizer};
use crate::infrastructure::dataset::load_dialogs;

/// Turns raw dialog files into normalized `(input, response)` pairs.
#[derive(Debug, Clone, Default)]
pub struct DatasetService {
    normalizer: TextNormalizer,
}

impl DatasetService {
    pub fn new(normalizer: TextNormalizer) -> Self {
        Self { normalizer }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn process(&self, path: &Path) -> Result<Vec<ConversationPair>, DomainError> {
        let dialogs = load_dialogs(path)?;
        let pairs = self.clean_dialogs(&dialogs);
        info!(dialogs = dialogs.len(), pairs = pairs.len(), "dataset processed");
        Ok(pairs)
    }

    /// Pairs adjacent utterances and normalizes both sides. Pairs with an
    /// empty side after normalization are dropped.
    pub fn clean_dialogs<S: AsRef<str>>(&self, dialogs: &[Vec<S>]) -> Vec<ConversationPair> {
        dialogs
            .iter()
            .flat_map(|dialog| training_pairs(dialog))
            .filter_map(|pair| {
                let input = self.normalizer.preprocess(&pair.input);
                let response = self.normalizer.preprocess(&pair.response);
                (!input.is_empty() && !response.is_empty())
                    .then(|| ConversationPair::new(input, response))
            })
            .collect()
    }
}
