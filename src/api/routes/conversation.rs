use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// `[question, answer]` pairs, oldest first.
    pub history: Vec<(String, String)>,
    pub total_turns: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn get_history(
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, StatusCode> {
    let Some(responder) = state.existing_responder() else {
        return Ok(Json(HistoryResponse {
            history: Vec::new(),
            total_turns: 0,
        }));
    };

    let turns = responder.history().map_err(|e| {
        tracing::error!(error = %e, "failed to read conversation history");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(HistoryResponse {
        total_turns: turns.len(),
        history: turns.into_iter().map(|t| t.into_pair()).collect(),
    }))
}

pub async fn clear_history(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, StatusCode> {
    let Some(responder) = state.existing_responder() else {
        return Ok(Json(MessageResponse {
            message: "No chatbot instance found".into(),
        }));
    };

    responder.clear_history().map_err(|e| {
        tracing::error!(error = %e, "failed to clear conversation history");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(MessageResponse {
        message: "Conversation history cleared".into(),
    }))
}
