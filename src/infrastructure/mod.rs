pub mod bootstrap;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod index_locator;
pub mod llm;
pub mod monitoring;
pub mod telemetry;
pub mod vector_store;

pub use bootstrap::ConfiguredResponderFactory;
pub use config::{AppConfig, Config, PromptsConfig};
pub use embedding::{HashingEmbedding, RigEmbedding};
pub use index_locator::IndexLocator;
pub use llm::RigLlm;
pub use monitoring::{InteractionLog, InteractionRecord, MonitoringReport};
pub use telemetry::init_tracing;
pub use vector_store::{FlatIndex, QdrantVectorStore};

use crate::domain::DomainError;

/// Fails with a configuration error instead of letting a provider client
/// panic on a missing key.
pub(crate) fn require_env(name: &str) -> Result<String, DomainError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DomainError::config(format!("{name} is not set")))
}
