//! Thin HTTP client for the chat API.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::api::routes::chat::ChatResponse;
use crate::api::routes::conversation::{HistoryResponse, MessageResponse};
use crate::application::AskOptions;
use crate::domain::DomainError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct ChatBody<'a> {
    message: &'a str,
    use_history: bool,
    record_history: bool,
}

impl<'a> ChatBody<'a> {
    fn new(message: &'a str, options: AskOptions) -> Self {
        Self {
            message,
            use_history: options.use_history,
            record_history: options.record_turn,
        }
    }
}

pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(
        &self,
        message: &str,
        options: AskOptions,
    ) -> Result<ChatResponse, DomainError> {
        let response = self
            .http
            .post(self.url("/chat"))
            .json(&ChatBody::new(message, options))
            .send()
            .await
            .map_err(request_error)?;
        decode(response).await
    }

    pub async fn history(&self) -> Result<HistoryResponse, DomainError> {
        let response = self
            .http
            .get(self.url("/conversation/history"))
            .send()
            .await
            .map_err(request_error)?;
        decode(response).await
    }

    pub async fn clear_history(&self) -> Result<MessageResponse, DomainError> {
        let response = self
            .http
            .delete(self.url("/conversation/clear"))
            .send()
            .await
            .map_err(request_error)?;
        decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn request_error(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::timeout("request timed out")
    } else if e.is_connect() {
        DomainError::external(format!("cannot connect to API server: {e}"))
    } else {
        DomainError::external(e.to_string())
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, DomainError> {
    let status = response.status();
    if !status.is_success() {
        return Err(DomainError::external(format!("API error: {status}")));
    }
    response
        .json()
        .await
        .map_err(|e| DomainError::external(format!("unexpected API response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ChatClient::new("http://localhost:8000/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/chat"), "http://localhost:8000/chat");
    }

    #[test]
    fn test_chat_body_sends_both_history_flags() {
        let options = AskOptions {
            use_history: false,
            record_turn: true,
        };
        let body = serde_json::to_value(ChatBody::new("hi", options)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"message": "hi", "use_history": false, "record_history": true})
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let client = ChatClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(client.history().await.is_err());
    }
}
