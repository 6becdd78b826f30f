mod hashing;
mod hosted;

use std::sync::Arc;

pub use self::hashing::HashingEmbedding;
pub use self::hosted::RigEmbedding;

use crate::domain::{ports::EmbeddingService, Result};
use crate::infrastructure::config::{EmbeddingConfig, EmbeddingProvider};

pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingService>> {
    Ok(match config.provider {
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedding::new(config.dimension)),
        EmbeddingProvider::Gemini | EmbeddingProvider::OpenAi => {
            Arc::new(RigEmbedding::from_config(config)?)
        }
    })
}
