use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

pub const SERVICE_NAME: &str = "MemeLingo API";

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

pub async fn status() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
    })
}
