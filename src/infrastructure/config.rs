use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{DomainError, Result};

pub const CONFIG_DIR_ENV: &str = "RAGCHAT_CONFIG_DIR";
pub const INDEX_DIR_ENV: &str = "RAGCHAT_INDEX_DIR";

const APP_FILE: &str = "app.yaml";
const PROMPTS_FILE: &str = "prompts.yaml";

/// Runtime settings plus prompt texts, loaded from `config/app.yaml` and
/// `config/prompts.yaml`. Missing files and fields fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let dir = std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".into());
        let mut config = Self::load_from_dir(Path::new(&dir))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Ok(Self {
            config: read_yaml_or_default(&dir.join(APP_FILE))?,
            prompts: read_yaml_or_default(&dir.join(PROMPTS_FILE))?,
        })
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.config.server.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            self.config.server.port = port
                .parse()
                .map_err(|_| DomainError::config(format!("SERVER_PORT is not a port: {port}")))?;
        }
        if let Ok(dir) = std::env::var(INDEX_DIR_ENV) {
            self.config.index.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.config;
        if c.rag.top_k == 0 {
            return Err(DomainError::config("rag.top_k must be > 0"));
        }
        if c.indexing.chunk_size == 0 {
            return Err(DomainError::config("indexing.chunk_size must be > 0"));
        }
        if c.indexing.chunk_overlap >= c.indexing.chunk_size {
            return Err(DomainError::config(
                "indexing.chunk_overlap must be smaller than indexing.chunk_size",
            ));
        }
        if c.indexing.batch_size == 0 || c.indexing.concurrency == 0 {
            return Err(DomainError::config(
                "indexing.batch_size and indexing.concurrency must be > 0",
            ));
        }
        if c.index.dir.is_none() && c.index.roots.is_empty() {
            return Err(DomainError::config("index.dir or index.roots must be set"));
        }
        if !self.prompts.rag.template.contains("{question}") {
            return Err(DomainError::config(
                "prompts.rag.template must contain {question}",
            ));
        }
        Ok(())
    }
}

fn read_yaml_or_default<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if !path.exists() {
        debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| DomainError::io(path, e))?;
    let value = serde_yaml::from_str(&raw)
        .map_err(|e| DomainError::config(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "config loaded");
    Ok(value)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub history: HistoryConfig,
    pub index: IndexConfig,
    pub indexing: IndexingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    Anthropic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub timeout_seconds: u64,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: "gemini-2.0-flash".into(),
            timeout_seconds: 60,
            temperature: None,
            max_tokens: Some(1024),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Gemini,
    OpenAi,
    /// Offline feature hashing; no network, no API key.
    Hashing,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Gemini,
            model: "text-embedding-004".into(),
            dimension: 768,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Turns kept in memory.
    pub max_turns: usize,
    /// Most recent turns rendered into the prompt.
    pub prompt_turns: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: 5,
            prompt_turns: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Local,
    Qdrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexVariant {
    Small,
    Full,
}

impl IndexVariant {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Small => "rag-index-small",
            Self::Full => "rag-index",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    /// Explicit index directory; when set, `roots` are ignored.
    pub dir: Option<PathBuf>,
    pub variant: IndexVariant,
    /// Directories searched in order for `<root>/<variant dir>`.
    pub roots: Vec<PathBuf>,
    /// Materialize the placeholder index when nothing is found.
    pub seed_fallback: bool,
    pub qdrant_url: String,
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Local,
            dir: None,
            variant: IndexVariant::Small,
            roots: vec![PathBuf::from("model")],
            seed_fallback: false,
            qdrant_url: "http://localhost:6334".into(),
            collection: "conversations".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub concurrency: usize,
    pub cleaned_path: PathBuf,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            batch_size: 64,
            concurrency: 4,
            cleaned_path: PathBuf::from("data/processed/cleaned_conversations.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_path: PathBuf,
    /// Daily reports are saved here when set.
    pub reports_dir: Option<PathBuf>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: PathBuf::from("monitoring/logs/chat_logs.jsonl"),
            reports_dir: Some(PathBuf::from("monitoring/reports")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub rag: RagPrompts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: Option<String>,
    /// Placeholders: `{context}`, `{history}`, `{question}`.
    pub template: String,
    pub history_header: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: None,
            template: "Based on the following context, provide a helpful answer.\n\n\
                       Context: {context}\n\
                       {history}\n\
                       Question: {question}\n\n\
                       Please provide a clear and accurate response:"
                .into(),
            history_header: "Previous conversation:".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.config.rag.top_k, 3);
        assert_eq!(config.config.history.max_turns, 5);
        assert_eq!(config.config.history.prompt_turns, 3);
        assert_eq!(config.config.server.port, 8000);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(APP_FILE),
            "rag:\n  top_k: 5\nindex:\n  variant: full\n  roots: [a, b]\nembedding:\n  provider: hashing\n",
        )
        .unwrap();

        let config = AppConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.config.rag.top_k, 5);
        assert_eq!(config.config.index.variant, IndexVariant::Full);
        assert_eq!(
            config.config.index.roots,
            vec![PathBuf::from("a"), PathBuf::from("b")]
        );
        assert_eq!(config.config.embedding.provider, EmbeddingProvider::Hashing);
        assert_eq!(config.config.history.max_turns, 5);
        assert!(config.prompts.rag.template.contains("{context}"));
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(APP_FILE), "rag: [not, a, map]").unwrap();

        let err = AppConfig::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, DomainError::Config(_)));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.config.indexing.chunk_overlap = config.config.indexing.chunk_size;
        assert!(config.validate().is_err());
    }
}
