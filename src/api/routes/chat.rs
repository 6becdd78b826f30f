use std::time::Instant;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::application::{Answer, AskOptions};
use crate::infrastructure::InteractionRecord;

fn default_use_history() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_use_history")]
    pub use_history: bool,
    /// Whether this exchange is appended to history; defaults to `use_history`.
    #[serde(default)]
    pub record_history: Option<bool>,
}

impl ChatRequest {
    pub fn options(&self) -> AskOptions {
        AskOptions {
            use_history: self.use_history,
            record_turn: self.record_history.unwrap_or(self.use_history),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    pub answer: String,
    pub sources_count: usize,
    /// Seconds.
    pub response_time: f64,
}

/// Always 200; failures are reported in the body.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let start = Instant::now();

    let answer = match state.responder().await {
        Ok(responder) => responder.ask(&request.message, request.options()).await,
        Err(e) => {
            tracing::error!(error = %e, "chat responder unavailable");
            Answer::failure(format!("Server Error: {e}"))
        }
    };

    let response_time = start.elapsed().as_secs_f64();
    tracing::info!(
        success = answer.success,
        sources = answer.sources_count,
        response_time,
        "chat request processed"
    );

    if let Some(monitor) = &state.monitor {
        let record = InteractionRecord {
            timestamp: Utc::now(),
            question: request.message.clone(),
            response_length: answer.answer.chars().count(),
            response_time,
            sources_used: answer.sources_count,
            success: answer.success,
            error: if answer.success {
                String::new()
            } else {
                answer.answer.clone()
            },
        };
        if let Err(e) = monitor.append(&record).await {
            tracing::warn!(error = %e, "failed to record interaction");
        }
    }

    Json(ChatResponse {
        success: answer.success,
        answer: answer.answer,
        sources_count: answer.sources_count,
        response_time,
    })
}
