mod conversation;
mod dataset;
mod document;
mod embedding;

pub use conversation::{render_turns, ConversationHistory, ConversationTurn, MessageRole};
pub use dataset::{training_pairs, ConversationPair};
pub use document::{chunk_documents, Document, Metadata, SearchResult};
pub use embedding::Embedding;
