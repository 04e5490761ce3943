use crate::auth::AuthUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tubely_core::models::{CreateVideoRequest, Video};
use tubely_core::AppError;

/// Create a draft record owned by the requester. The video itself arrives later
/// through the upload endpoint.
#[tracing::instrument(
    skip(state, request),
    fields(user_id = %auth.user_id, operation = "create_video")
)]
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateVideoRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title must not be empty".to_string()).into());
    }
    let description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let video = state
        .videos
        .create_video(&Video::draft(auth.user_id, title, description))
        .await?;
    tracing::info!(video_id = %video.id, "Video record created");

    let response = state.resolver().to_response(video).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
