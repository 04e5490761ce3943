//! Video API integration tests.
//!
//! Run with: `cargo test -p tubely-api --test videos_test`

mod helpers;

use helpers::auth::{bearer, expired_token_for, token_for, token_with_wrong_secret};
use helpers::fixtures::{draft_video, video_form, VIDEO_BYTES};
use helpers::{api_path, setup_test_app, setup_test_app_with_geometry, TEST_MAX_VIDEO_BYTES};
use tubely_api::ErrorResponse;
use tubely_core::models::{StreamGeometry, VideoResponse};
use tubely_processing::test_helpers::{FakeRemuxer, InMemoryObjectStore};
use uuid::Uuid;

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_video_is_owned_by_requester() {
    let app = setup_test_app().await;
    let user_id = Uuid::new_v4();

    let response = app
        .client()
        .post(&api_path("/videos"))
        .add_header("Authorization", bearer(&token_for(user_id)))
        .json(&serde_json::json!({ "title": "Boot camp", "description": "Day one" }))
        .await;

    assert_eq!(response.status_code(), 201);
    let created: VideoResponse = response.json();
    assert_eq!(created.user_id, user_id);
    assert_eq!(created.title, "Boot camp");
    assert!(created.video_url.is_none());
    assert!(app.videos.get(created.id).is_some());
}

#[tokio::test]
async fn test_create_video_rejects_blank_title() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/videos"))
        .add_header("Authorization", bearer(&token_for(Uuid::new_v4())))
        .json(&serde_json::json!({ "title": "   " }))
        .await;

    assert_eq!(response.status_code(), 400);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "INVALID_INPUT");
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/videos"))
        .json(&serde_json::json!({ "title": "Boot camp" }))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .client()
        .get(&api_path(&format!("/videos/{}", Uuid::new_v4())))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_expired_and_forged_tokens_are_unauthorized() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);

    for token in [expired_token_for(owner), token_with_wrong_secret(owner)] {
        let response = app
            .client()
            .post(&api_path(&format!("/videos/{}/upload", video.id)))
            .add_header("Authorization", bearer(&token))
            .multipart(video_form(VIDEO_BYTES, "video/mp4"))
            .await;

        assert_eq!(response.status_code(), 401);
    }
    assert_eq!(app.staging.stage_calls(), 0);
}

#[tokio::test]
async fn test_upload_stores_remuxed_video_and_returns_presigned_url() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(video_form(VIDEO_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 200);
    let uploaded: VideoResponse = response.json();
    let url = uploaded.video_url.expect("video_url");
    assert!(url.starts_with("memory://tubely-test/landscape/"));
    assert!(uploaded.video_url_expires_at.is_some());

    // The stored object is the remuxed output, not the raw upload.
    assert_eq!(
        app.store.fetch_url(&url),
        Some(FakeRemuxer::remuxed_bytes(VIDEO_BYTES))
    );

    // The record holds the (bucket, key) pair, never the URL.
    let stored = app.videos.get(video.id).expect("record");
    let reference = stored.video.expect("reference");
    assert_eq!(reference.bucket, InMemoryObjectStore::BUCKET);
    assert!(reference.key.starts_with("landscape/"));
    assert!(reference.key.ends_with(".mp4"));

    assert_eq!(app.prober.calls(), 1);
    assert_eq!(app.remuxer.calls(), 1);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_get_resolves_stored_reference_on_every_read() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);

    app.client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(video_form(VIDEO_BYTES, "video/mp4"))
        .await;
    let presigned_after_upload = app.store.presign_calls();

    // Any authenticated user may read.
    let response = app
        .client()
        .get(&api_path(&format!("/videos/{}", video.id)))
        .add_header("Authorization", bearer(&token_for(Uuid::new_v4())))
        .await;

    assert_eq!(response.status_code(), 200);
    let fetched: VideoResponse = response.json();
    let url = fetched.video_url.expect("video_url");
    assert_eq!(
        app.store.fetch_url(&url),
        Some(FakeRemuxer::remuxed_bytes(VIDEO_BYTES))
    );
    assert_eq!(app.store.presign_calls(), presigned_after_upload + 1);
}

#[tokio::test]
async fn test_reupload_replaces_stored_object() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);

    for _ in 0..2 {
        let response = app
            .client()
            .post(&api_path(&format!("/videos/{}/upload", video.id)))
            .add_header("Authorization", bearer(&token_for(owner)))
            .multipart(video_form(VIDEO_BYTES, "video/mp4"))
            .await;
        assert_eq!(response.status_code(), 200);
    }

    let current = app.videos.get(video.id).and_then(|v| v.video).expect("ref");
    assert_eq!(app.store.object_count(), 1);
    assert_eq!(app.store.delete_calls(), 1);
    assert!(app.store.object(&current.bucket, &current.key).is_some());
}

#[tokio::test]
async fn test_upload_of_portrait_video_uses_portrait_prefix() {
    let app =
        setup_test_app_with_geometry(StreamGeometry::new(1080, 1920).expect("geometry")).await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(video_form(VIDEO_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 200);
    let stored = app.videos.get(video.id).and_then(|v| v.video).expect("ref");
    assert!(stored.key.starts_with("portrait/"));
}

#[tokio::test]
async fn test_upload_by_non_owner_is_forbidden_before_staging() {
    let app = setup_test_app().await;
    let video = draft_video(&app, Uuid::new_v4());

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(Uuid::new_v4())))
        .multipart(video_form(VIDEO_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 403);
    assert_eq!(app.staging.stage_calls(), 0);
    assert_eq!(app.store.put_calls(), 0);
    assert!(app.videos.get(video.id).and_then(|v| v.video).is_none());
}

#[tokio::test]
async fn test_upload_with_wrong_content_type_is_rejected() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(video_form(VIDEO_BYTES, "video/quicktime"))
        .await;

    assert_eq!(response.status_code(), 400);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "INVALID_INPUT");
    assert_eq!(app.staging.stage_calls(), 0);
    assert_eq!(app.store.put_calls(), 0);
}

#[tokio::test]
async fn test_upload_accepts_content_type_parameters() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(video_form(VIDEO_BYTES, "video/mp4; codecs=avc1"))
        .await;

    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_upload_without_video_field_is_bad_request() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);

    let form = axum_test::multipart::MultipartForm::new().add_text("title", "no video here");
    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(app.staging.stage_calls(), 0);
}

#[tokio::test]
async fn test_upload_to_unknown_video_is_not_found() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", Uuid::new_v4())))
        .add_header("Authorization", bearer(&token_for(Uuid::new_v4())))
        .multipart(video_form(VIDEO_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 404);
    assert_eq!(app.staging.stage_calls(), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_without_leftovers() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);
    let oversized = vec![7u8; TEST_MAX_VIDEO_BYTES as usize + 1];

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(video_form(&oversized, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 413);
    assert_eq!(app.prober.calls(), 0);
    assert_eq!(app.store.put_calls(), 0);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_metadata_write_failure_is_reported_distinctly() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);
    app.videos.fail_updates(true);

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(video_form(VIDEO_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 500);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "PERSISTENCE_ERROR");

    // Compensating delete ran and nothing is left behind.
    assert_eq!(app.store.put_calls(), 1);
    assert_eq!(app.store.delete_calls(), 1);
    assert_eq!(app.store.object_count(), 0);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_store_failure_is_bad_gateway_and_record_unchanged() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = draft_video(&app, owner);
    app.store.fail_puts(true);

    let response = app
        .client()
        .post(&api_path(&format!("/videos/{}/upload", video.id)))
        .add_header("Authorization", bearer(&token_for(owner)))
        .multipart(video_form(VIDEO_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 502);
    assert!(app.videos.get(video.id).and_then(|v| v.video).is_none());
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_get_unknown_video_is_not_found() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path(&format!("/videos/{}", Uuid::new_v4())))
        .add_header("Authorization", bearer(&token_for(Uuid::new_v4())))
        .await;

    assert_eq!(response.status_code(), 404);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "NOT_FOUND");
}
