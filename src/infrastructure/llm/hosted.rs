use std::time::Duration;

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::{anthropic, gemini};

use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::{LlmConfig, LlmProvider};
use crate::infrastructure::require_env;

enum Client {
    Gemini(gemini::Client),
    Anthropic(anthropic::Client),
}

/// Hosted generation model behind a bounded wait.
pub struct RigLlm {
    client: Client,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
    timeout: Duration,
}

macro_rules! prompt_agent {
    ($client:expr, $model:expr, $system:expr, $temperature:expr, $max_tokens:expr, $prompt:expr) => {{
        let mut builder = $client.agent($model);
        if let Some(system) = $system {
            builder = builder.preamble(system);
        }
        if let Some(temperature) = $temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = $max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        let agent = builder.build();
        let response = agent.prompt($prompt).await;
        response
    }};
}

impl RigLlm {
    pub fn from_config(config: &LlmConfig) -> Result<Self, DomainError> {
        let client = match config.provider {
            LlmProvider::Gemini => {
                require_env("GEMINI_API_KEY")?;
                Client::Gemini(gemini::Client::from_env())
            }
            LlmProvider::Anthropic => {
                require_env("ANTHROPIC_API_KEY")?;
                Client::Anthropic(anthropic::Client::from_env())
            }
        };

        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    async fn generate(&self, system: Option<&str>, prompt: &str) -> Result<String, DomainError> {
        let call = async {
            match &self.client {
                Client::Gemini(client) => {
                    prompt_agent!(
                        client,
                        &self.model,
                        system,
                        self.temperature,
                        self.max_tokens,
                        prompt
                    )
                }
                Client::Anthropic(client) => {
                    prompt_agent!(
                        client,
                        &self.model,
                        system,
                        self.temperature,
                        self.max_tokens,
                        prompt
                    )
                }
            }
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| DomainError::timeout("Generation timed out"))?
            .map_err(|e| DomainError::external(format!("Generation failed: {e}")))
    }
}

#[async_trait]
impl LlmService for RigLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.generate(None, prompt).await
    }

    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.generate(Some(system), prompt).await
    }
}
