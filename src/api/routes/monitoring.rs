use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use crate::api::state::AppState;
use crate::infrastructure::MonitoringReport;

/// Last 24 hours of `/chat` traffic, also saved as the daily report.
/// 404 when monitoring is disabled.
pub async fn report(State(state): State<AppState>) -> Result<Json<MonitoringReport>, StatusCode> {
    let monitor = state.monitor.as_ref().ok_or(StatusCode::NOT_FOUND)?;

    let report = monitor.report(Utc::now()).await.map_err(|e| {
        tracing::error!(error = %e, "failed to build monitoring report");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match monitor.save_report(&report).await {
        Ok(Some(path)) => tracing::info!(path = %path.display(), "daily report saved"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "failed to save daily report"),
    }
    Ok(Json(report))
}
