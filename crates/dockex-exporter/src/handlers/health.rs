use axum::{http::StatusCode, response::IntoResponse};

/// Ready as soon as the process serves HTTP; daemon health is reported by `docker_up`.
pub async fn ready() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
