//! Supported formats endpoint.

use axum::Json;
use serde::Serialize;

use avkit_models::MediaKind;

#[derive(Serialize)]
pub struct FormatsResponse {
    pub video: Vec<&'static str>,
    pub audio: Vec<&'static str>,
}

/// `GET /formats`: accepted input extensions per media kind.
pub async fn formats() -> Json<FormatsResponse> {
    Json(FormatsResponse {
        video: MediaKind::Video.extensions().to_vec(),
        audio: MediaKind::Audio.extensions().to_vec(),
    })
}
