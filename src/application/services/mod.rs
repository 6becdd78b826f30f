mod dataset;
mod indexing;
mod rag;
mod responder;

pub use dataset::DatasetService;
pub use indexing::{
    documents_from_pairs, fallback_documents, IndexStats, IndexingService, CONVERSATION_SOURCE,
    FALLBACK_DOCUMENTS,
};
pub use rag::RagService;
pub use responder::{
    Answer, AskOptions, ChatResponder, PromptTemplate, ResponderFactory, DEFAULT_MAX_TURNS,
    DEFAULT_PROMPT_TURNS,
};
