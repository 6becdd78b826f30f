use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "RAG Chatbot API is running!".into(),
    })
}

/// Answers without touching the responder, so it stays green while the
/// index or model is unavailable.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: "chatbot-api".into(),
    })
}
