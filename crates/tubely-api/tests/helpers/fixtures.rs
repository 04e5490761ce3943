use axum_test::multipart::{MultipartForm, Part};
use tubely_core::models::Video;
use uuid::Uuid;

/// Stand-in for an MP4 file; the fake prober and remuxer never parse it.
pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42 fake mp4 payload";

/// Insert a draft record owned by `owner` and return it.
pub fn draft_video(app: &super::TestApp, owner: Uuid) -> Video {
    let video = Video::draft(owner, "Boot camp", Some("Day one".to_string()));
    app.videos.insert(video.clone());
    video
}

/// A form with a single `video` part.
pub fn video_form(data: &[u8], mime_type: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "video",
        Part::bytes(data.to_vec())
            .file_name("clip.mp4")
            .mime_type(mime_type),
    )
}
