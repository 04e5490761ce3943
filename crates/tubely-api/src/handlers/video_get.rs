use crate::auth::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tubely_core::AppError;
use uuid::Uuid;

/// Return a record with its video reference resolved to an access URL. A presigned
/// URL is minted on every call.
#[tracing::instrument(
    skip(state),
    fields(
        user_id = %auth.user_id,
        video_id = %id,
        operation = "get_video"
    )
)]
pub async fn get_video(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .get_video(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    let response = state.resolver().to_response(video).await?;

    Ok(Json(response))
}
