use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres};
use tubely_core::models::{ObjectReference, Video};
use tubely_core::AppError;
use uuid::Uuid;

/// Result of pointing a record at a newly stored video.
#[derive(Debug, Clone)]
pub struct ReferenceUpdate {
    pub video: Video,
    /// The reference the record held before the write, if any.
    pub previous: Option<ObjectReference>,
}

/// Metadata store for media records.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create_video(&self, video: &Video) -> Result<Video, AppError>;

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError>;

    /// Set the video reference of record `id`, provided it is still owned by
    /// `owner_id`. Only the reference columns and `updated_at` are written, both
    /// reference columns in one statement.
    ///
    /// Fails with `AppError::NotFound` when no record with that id and owner exists.
    async fn set_video_reference(
        &self,
        id: Uuid,
        owner_id: Uuid,
        reference: &ObjectReference,
    ) -> Result<ReferenceUpdate, AppError>;
}

#[derive(Debug, FromRow)]
struct VideoRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    thumbnail_url: Option<String>,
    video_bucket: Option<String>,
    video_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        let video = match (row.video_bucket, row.video_key) {
            (Some(bucket), Some(key)) => Some(ObjectReference::new(bucket, key)),
            _ => None,
        };
        Video {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            thumbnail_url: row.thumbnail_url,
            video,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReferenceUpdateRow {
    #[sqlx(flatten)]
    video: VideoRow,
    previous_bucket: Option<String>,
    previous_key: Option<String>,
}

impl From<ReferenceUpdateRow> for ReferenceUpdate {
    fn from(row: ReferenceUpdateRow) -> Self {
        let previous = match (row.previous_bucket, row.previous_key) {
            (Some(bucket), Some(key)) => Some(ObjectReference::new(bucket, key)),
            _ => None,
        };
        ReferenceUpdate {
            video: row.video.into(),
            previous,
        }
    }
}

const VIDEO_COLUMNS: &str = "id, user_id, title, description, thumbnail_url, video_bucket, video_key, created_at, updated_at";

/// PostgreSQL-backed video repository
#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    #[tracing::instrument(skip(self, video), fields(db.table = "videos", db.operation = "insert", db.record_id = %video.id))]
    async fn create_video(&self, video: &Video) -> Result<Video, AppError> {
        let (bucket, key) = split_reference(video.video.as_ref());
        let row = sqlx::query_as::<Postgres, VideoRow>(&format!(
            r#"
            INSERT INTO videos (id, user_id, title, description, thumbnail_url, video_bucket, video_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            VIDEO_COLUMNS
        ))
        .bind(video.id)
        .bind(video.user_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(bucket)
        .bind(key)
        .bind(video.created_at)
        .bind(video.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select", db.record_id = %id))]
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        let row = sqlx::query_as::<Postgres, VideoRow>(&format!(
            "SELECT {} FROM videos WHERE id = $1",
            VIDEO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Video::from))
    }

    #[tracing::instrument(skip(self, reference), fields(db.table = "videos", db.operation = "update", db.record_id = %id))]
    async fn set_video_reference(
        &self,
        id: Uuid,
        owner_id: Uuid,
        reference: &ObjectReference,
    ) -> Result<ReferenceUpdate, AppError> {
        // The row lock in `previous` makes the returned old reference the one this
        // statement actually replaced.
        let row = sqlx::query_as::<Postgres, ReferenceUpdateRow>(
            r#"
            WITH previous AS (
                SELECT id, video_bucket, video_key
                FROM videos
                WHERE id = $1 AND user_id = $4
                FOR UPDATE
            )
            UPDATE videos
            SET video_bucket = $2, video_key = $3, updated_at = NOW()
            FROM previous
            WHERE videos.id = previous.id
            RETURNING videos.id, videos.user_id, videos.title, videos.description,
                      videos.thumbnail_url, videos.video_bucket, videos.video_key,
                      videos.created_at, videos.updated_at,
                      previous.video_bucket AS previous_bucket,
                      previous.video_key AS previous_key
            "#,
        )
        .bind(id)
        .bind(&reference.bucket)
        .bind(&reference.key)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReferenceUpdate::from).ok_or_else(|| {
            AppError::NotFound(format!("Video {} not found for owner {}", id, owner_id))
        })
    }
}

fn split_reference(reference: Option<&ObjectReference>) -> (Option<&str>, Option<&str>) {
    match reference {
        Some(r) => (Some(r.bucket.as_str()), Some(r.key.as_str())),
        None => (None, None),
    }
}
