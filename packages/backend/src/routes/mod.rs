mod explain;
mod health;
mod lesson;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::ProxyError;
use crate::services::vision::VisionError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::status))
        .route("/api/explain-meme", post(explain::explain_meme))
        .route("/api/generate-lesson", post(lesson::generate_lesson))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    ProxyError::not_found("route not found").into_response()
}

/// Maps a failed or unusable LLM exchange to the endpoint's 500 response,
/// carrying the underlying error as `details`. A missing API key is the
/// configuration error the original proxy reported; everything else keeps the
/// per-endpoint user-facing message.
pub(crate) fn generation_error(user_message: &str, err: VisionError) -> Response {
    tracing::error!(error = %err, "generation request failed");

    match err {
        VisionError::NotConfigured => {
            ProxyError::configuration("OpenAI API key not configured").into_response()
        }
        other => ProxyError::internal(user_message)
            .with_details(other.to_string())
            .into_response(),
    }
}

/// Maps model output that decoded as JSON but not as the required record
/// shape to the generic per-endpoint failure.
pub(crate) fn malformed_output_error(user_message: &str, err: serde_json::Error) -> Response {
    tracing::error!(error = %err, "model output missing required fields");

    ProxyError::new(StatusCode::INTERNAL_SERVER_ERROR, user_message)
        .with_details(err.to_string())
        .into_response()
}
