//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits); concrete adapters are
//! wired in by `infrastructure::bootstrap` and the binaries.

pub mod services;

pub use services::{
    fallback_documents, Answer, AskOptions, ChatResponder, DatasetService, IndexStats,
    IndexingService, PromptTemplate, RagService, ResponderFactory,
};
