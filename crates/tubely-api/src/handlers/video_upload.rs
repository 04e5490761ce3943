use crate::auth::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use tubely_core::constants::VIDEO_FORM_FIELD;
use tubely_core::AppError;
use uuid::Uuid;

/// Upload the video for an existing record.
///
/// The `video` part is streamed straight into the ingestion pipeline; its declared
/// content type is checked there before anything touches disk. Other parts are
/// skipped.
#[tracing::instrument(
    skip(state, multipart),
    fields(
        user_id = %auth.user_id,
        video_id = %video_id,
        operation = "upload_video"
    )
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FORM_FIELD) {
            tracing::debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let stream = Box::pin(field.map_err(std::io::Error::other));
        let reader = Box::pin(StreamReader::new(stream));

        let response = state
            .ingest
            .ingest_video(video_id, auth.user_id, &content_type, reader)
            .await?;
        return Ok(Json(response));
    }

    Err(AppError::InvalidInput(format!(
        "Missing multipart field '{}'",
        VIDEO_FORM_FIELD
    ))
    .into())
}
