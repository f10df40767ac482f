use serde::Serialize;

use super::Database;
use crate::error::AppError;

/// Characters of the original text shown in download listings.
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Download {
    pub id: i64,
    pub user_id: i64,
    pub history_id: i64,
    pub original_filename: String,
    pub stored_filename: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub download_count: i64,
    pub created_at: String,
    pub last_downloaded_at: Option<String>,
}

/// A download joined with the request that produced it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DownloadSummary {
    pub id: i64,
    pub history_id: i64,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub download_count: i64,
    pub created_at: String,
    pub last_downloaded_at: Option<String>,
    pub original_text: String,
    pub tone: String,
    pub voice: String,
}

pub struct NewDownload<'a> {
    pub user_id: i64,
    pub history_id: i64,
    pub original_filename: &'a str,
    pub stored_filename: &'a str,
    pub file_path: &'a str,
    pub file_size: i64,
    pub mime_type: &'a str,
}

/// Shorten `text` to `PREVIEW_CHARS` characters, marking the cut with `...`.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

impl Database {
    pub async fn save_download(&self, download: &NewDownload<'_>) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO downloads
                (user_id, history_id, original_filename, stored_filename, file_path, file_size, mime_type)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(download.user_id)
        .bind(download.history_id)
        .bind(download.original_filename)
        .bind(download.stored_filename)
        .bind(download.file_path)
        .bind(download.file_size)
        .bind(download.mime_type)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_downloads(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<DownloadSummary>, AppError> {
        let mut downloads = sqlx::query_as::<_, DownloadSummary>(
            "SELECT d.id, d.history_id, d.original_filename, d.stored_filename, d.file_size,
                    d.mime_type, d.download_count, d.created_at, d.last_downloaded_at,
                    ah.original_text, ah.tone, ah.voice
             FROM downloads d
             JOIN audio_history ah ON d.history_id = ah.id
             WHERE d.user_id = ?
             ORDER BY d.created_at DESC, d.id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        for download in &mut downloads {
            download.original_text = preview(&download.original_text);
        }

        Ok(downloads)
    }

    /// Fetch a download, restricted to `user_id` when given.
    pub async fn get_download(
        &self,
        id: i64,
        user_id: Option<i64>,
    ) -> Result<Option<Download>, AppError> {
        let download = sqlx::query_as::<_, Download>(
            "SELECT * FROM downloads WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(download)
    }

    pub async fn record_download(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE downloads
             SET download_count = download_count + 1, last_downloaded_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Remove the row and hand it back so the caller can delete the file.
    pub async fn delete_download(
        &self,
        id: i64,
        user_id: Option<i64>,
    ) -> Result<Option<Download>, AppError> {
        let Some(download) = self.get_download(id, user_id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM downloads WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(Some(download))
    }

    pub async fn count_downloads(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM downloads")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewHistory, ProfileFields};

    async fn setup(text: &str) -> (Database, i64, i64) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .create_user("A", "a@example.com", None, &ProfileFields::default())
            .await
            .unwrap();
        let history = db
            .save_history(&NewHistory {
                user_id: user,
                original_text: text,
                rewritten_text: text,
                tone: "neutral",
                voice: "david",
            })
            .await
            .unwrap();
        (db, user, history)
    }

    fn new_download(user_id: i64, history_id: i64) -> NewDownload<'static> {
        NewDownload {
            user_id,
            history_id,
            original_filename: "audiobook.wav",
            stored_filename: "stored.wav",
            file_path: "/tmp/stored.wav",
            file_size: 1024,
            mime_type: "audio/wav",
        }
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let short = preview(&long);
        assert_eq!(short.chars().count(), 103);
        assert!(short.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_list_joins_history() {
        let (db, user, history) = setup(&"x".repeat(120)).await;
        db.save_download(&new_download(user, history)).await.unwrap();

        let downloads = db.list_downloads(user, 10).await.unwrap();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].voice, "david");
        assert_eq!(downloads[0].original_text.len(), 103);
    }

    #[tokio::test]
    async fn test_get_is_scoped_by_user() {
        let (db, user, history) = setup("hello").await;
        let id = db.save_download(&new_download(user, history)).await.unwrap();

        assert!(db.get_download(id, Some(user)).await.unwrap().is_some());
        assert!(db.get_download(id, Some(user + 1)).await.unwrap().is_none());
        assert!(db.get_download(id, None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_record_download_increments() {
        let (db, user, history) = setup("hello").await;
        let id = db.save_download(&new_download(user, history)).await.unwrap();
        db.record_download(id).await.unwrap();
        db.record_download(id).await.unwrap();

        let download = db.get_download(id, None).await.unwrap().unwrap();
        assert_eq!(download.download_count, 2);
        assert!(download.last_downloaded_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_returns_row() {
        let (db, user, history) = setup("hello").await;
        let id = db.save_download(&new_download(user, history)).await.unwrap();

        assert!(db.delete_download(id, Some(user + 1)).await.unwrap().is_none());
        let removed = db.delete_download(id, Some(user)).await.unwrap().unwrap();
        assert_eq!(removed.file_path, "/tmp/stored.wav");
        assert_eq!(db.count_downloads().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_downloads_cascade_with_history() {
        let (db, user, history) = setup("hello").await;
        db.save_download(&new_download(user, history)).await.unwrap();
        db.delete_history(user, history).await.unwrap();
        assert_eq!(db.count_downloads().await.unwrap(), 0);
    }
}
