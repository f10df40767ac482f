use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AudioHistory {
    pub id: i64,
    pub user_id: i64,
    pub original_text: String,
    pub rewritten_text: String,
    pub tone: String,
    pub voice: String,
    pub audio_file_path: Option<String>,
    pub audio_generated: bool,
    pub processing_status: ProcessingStatus,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewHistory<'a> {
    pub user_id: i64,
    pub original_text: &'a str,
    pub rewritten_text: &'a str,
    pub tone: &'a str,
    pub voice: &'a str,
}

impl Database {
    pub async fn save_history(&self, entry: &NewHistory<'_>) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO audio_history (user_id, original_text, rewritten_text, tone, voice)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(entry.original_text)
        .bind(entry.rewritten_text)
        .bind(entry.tone)
        .bind(entry.voice)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!("Saved history {} for user {}", id, entry.user_id);
        Ok(id)
    }

    pub async fn get_history(&self, id: i64) -> Result<Option<AudioHistory>, AppError> {
        let entry = sqlx::query_as::<_, AudioHistory>("SELECT * FROM audio_history WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(entry)
    }

    /// Newest first.
    pub async fn list_history(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<AudioHistory>, AppError> {
        let entries = sqlx::query_as::<_, AudioHistory>(
            "SELECT * FROM audio_history
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    /// Move an entry to `status`. A completed entry with a file is marked as generated;
    /// a failed entry loses its file reference.
    pub async fn set_history_status(
        &self,
        id: i64,
        status: ProcessingStatus,
        audio_file_path: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = match audio_file_path {
            Some(path) => {
                sqlx::query(
                    "UPDATE audio_history
                     SET processing_status = ?, audio_file_path = ?, audio_generated = ?,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?",
                )
                .bind(status)
                .bind(path)
                .bind(status == ProcessingStatus::Completed)
                .bind(id)
                .execute(self.pool())
                .await?
            }
            None => {
                let failed = status == ProcessingStatus::Failed;
                sqlx::query(
                    "UPDATE audio_history
                     SET processing_status = ?,
                         audio_generated = CASE WHEN ? THEN 0 ELSE audio_generated END,
                         audio_file_path = CASE WHEN ? THEN NULL ELSE audio_file_path END,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?",
                )
                .bind(status)
                .bind(failed)
                .bind(failed)
                .bind(id)
                .execute(self.pool())
                .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    /// Delete an entry owned by `user_id`, returning it if it existed.
    pub async fn delete_history(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<AudioHistory>, AppError> {
        let entry = sqlx::query_as::<_, AudioHistory>(
            "SELECT * FROM audio_history WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        if entry.is_some() {
            sqlx::query("DELETE FROM audio_history WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(self.pool())
                .await?;
        }

        Ok(entry)
    }

    /// Every audio file referenced by the user's history or downloads.
    pub async fn user_audio_paths(&self, user_id: i64) -> Result<Vec<String>, AppError> {
        let paths = sqlx::query_scalar::<_, String>(
            "SELECT audio_file_path FROM audio_history
             WHERE user_id = ? AND audio_file_path IS NOT NULL
             UNION
             SELECT file_path FROM downloads WHERE user_id = ?",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(paths)
    }

    pub async fn count_history(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM audio_history")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProfileFields;

    async fn setup() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let id = db
            .create_user("A", "a@example.com", None, &ProfileFields::default())
            .await
            .unwrap();
        (db, id)
    }

    fn entry(user_id: i64, text: &str) -> NewHistory<'_> {
        NewHistory {
            user_id,
            original_text: text,
            rewritten_text: text,
            tone: "calm",
            voice: "zira",
        }
    }

    #[tokio::test]
    async fn test_new_history_is_pending() {
        let (db, user) = setup().await;
        let id = db.save_history(&entry(user, "hello")).await.unwrap();

        let saved = db.get_history(id).await.unwrap().unwrap();
        assert_eq!(saved.processing_status, ProcessingStatus::Pending);
        assert!(!saved.audio_generated);
        assert!(saved.audio_file_path.is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let (db, user) = setup().await;
        for text in ["one", "two", "three"] {
            db.save_history(&entry(user, text)).await.unwrap();
        }

        let entries = db.list_history(user, 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].original_text, "three");
        assert_eq!(entries[1].original_text, "two");
    }

    #[tokio::test]
    async fn test_completed_with_path_marks_generated() {
        let (db, user) = setup().await;
        let id = db.save_history(&entry(user, "hello")).await.unwrap();

        assert!(db
            .set_history_status(id, ProcessingStatus::Completed, Some("/tmp/a.wav"))
            .await
            .unwrap());

        let saved = db.get_history(id).await.unwrap().unwrap();
        assert_eq!(saved.processing_status, ProcessingStatus::Completed);
        assert!(saved.audio_generated);
        assert_eq!(saved.audio_file_path.as_deref(), Some("/tmp/a.wav"));
    }

    #[tokio::test]
    async fn test_failed_status_without_path() {
        let (db, user) = setup().await;
        let id = db.save_history(&entry(user, "hello")).await.unwrap();
        db.set_history_status(id, ProcessingStatus::Failed, None)
            .await
            .unwrap();

        let saved = db.get_history(id).await.unwrap().unwrap();
        assert_eq!(saved.processing_status, ProcessingStatus::Failed);
        assert!(!saved.audio_generated);
    }

    #[tokio::test]
    async fn test_failure_after_completion_clears_audio() {
        let (db, user) = setup().await;
        let id = db.save_history(&entry(user, "hello")).await.unwrap();
        db.set_history_status(id, ProcessingStatus::Completed, Some("/tmp/a.wav"))
            .await
            .unwrap();
        db.set_history_status(id, ProcessingStatus::Failed, None)
            .await
            .unwrap();

        let saved = db.get_history(id).await.unwrap().unwrap();
        assert_eq!(saved.processing_status, ProcessingStatus::Failed);
        assert!(!saved.audio_generated);
        assert!(saved.audio_file_path.is_none());
    }

    #[tokio::test]
    async fn test_user_audio_paths_deduplicated() {
        let (db, user) = setup().await;
        let id = db.save_history(&entry(user, "hello")).await.unwrap();
        db.save_history(&entry(user, "no audio")).await.unwrap();
        db.set_history_status(id, ProcessingStatus::Completed, Some("/tmp/a.wav"))
            .await
            .unwrap();
        db.save_download(&crate::db::NewDownload {
            user_id: user,
            history_id: id,
            original_filename: "audiobook.wav",
            stored_filename: "a.wav",
            file_path: "/tmp/a.wav",
            file_size: 1,
            mime_type: "audio/wav",
        })
        .await
        .unwrap();

        assert_eq!(db.user_audio_paths(user).await.unwrap(), vec!["/tmp/a.wav"]);
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_owner() {
        let (db, user) = setup().await;
        let other = db
            .create_user("B", "b@example.com", None, &ProfileFields::default())
            .await
            .unwrap();
        let id = db.save_history(&entry(user, "mine")).await.unwrap();

        assert!(db.delete_history(other, id).await.unwrap().is_none());
        assert!(db.get_history(id).await.unwrap().is_some());

        assert!(db.delete_history(user, id).await.unwrap().is_some());
        assert!(db.get_history(id).await.unwrap().is_none());
    }
}
