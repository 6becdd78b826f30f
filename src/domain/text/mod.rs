//! Text handling shared by the dataset cleaner and the index builder.

mod lemma;
mod normalizer;
mod splitter;
mod stopwords;

pub use lemma::lemmatize;
pub use normalizer::TextNormalizer;
pub use splitter::TextSplitter;
pub use stopwords::is_stop_word;
