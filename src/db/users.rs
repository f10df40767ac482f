use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::{is_unique_violation, AppError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub date_of_birth: Option<String>,
    pub university: Option<String>,
    pub course: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
    pub gpa: Option<f64>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub is_suspended: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Optional profile columns of a user. Absent fields are left untouched on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFields {
    pub phone: Option<String>,
    pub location: Option<String>,
    pub date_of_birth: Option<String>,
    pub university: Option<String>,
    pub course: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
    pub gpa: Option<f64>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub status: String,
    pub created_at: String,
}

impl Database {
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
        profile: &ProfileFields,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, phone, location, date_of_birth,
                                university, course, year, roll_number, gpa, bio)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(&profile.phone)
        .bind(&profile.location)
        .bind(&profile.date_of_birth)
        .bind(&profile.university)
        .bind(&profile.course)
        .bind(&profile.year)
        .bind(&profile.roll_number)
        .bind(profile.gpa)
        .bind(&profile.bio)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("User with email '{}' already exists", email))
            } else {
                AppError::Database(e)
            }
        })?;

        let id = result.last_insert_rowid();
        tracing::info!("Created user {} ({})", id, email);
        Ok(id)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Existing user for `email`, or a fresh one named `name`.
    pub async fn get_or_create_user(&self, email: &str, name: &str) -> Result<User, AppError> {
        if let Some(user) = self.get_user_by_email(email).await? {
            return Ok(user);
        }

        let id = self
            .create_user(name, email, None, &ProfileFields::default())
            .await?;
        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", id)))
    }

    /// Partial update; returns false when no such user exists.
    pub async fn update_user(
        &self,
        id: i64,
        name: Option<&str>,
        profile: &ProfileFields,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET
                name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                location = COALESCE(?, location),
                date_of_birth = COALESCE(?, date_of_birth),
                university = COALESCE(?, university),
                course = COALESCE(?, course),
                year = COALESCE(?, year),
                roll_number = COALESCE(?, roll_number),
                gpa = COALESCE(?, gpa),
                bio = COALESCE(?, bio),
                updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(name)
        .bind(&profile.phone)
        .bind(&profile.location)
        .bind(&profile.date_of_birth)
        .bind(&profile.university)
        .bind(&profile.course)
        .bind(&profile.year)
        .bind(&profile.roll_number)
        .bind(profile.gpa)
        .bind(&profile.bio)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the user; profile rows, history and downloads cascade.
    pub async fn delete_user(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn record_user_login(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET last_login = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_user_suspended(&self, id: i64, suspended: bool) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET is_suspended = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(suspended)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn recent_users(&self, limit: i64) -> Result<Vec<RecentUser>, AppError> {
        let users = sqlx::query_as::<_, RecentUser>(
            "SELECT id, name, email, created_at,
                    CASE
                        WHEN is_suspended THEN 'Suspended'
                        WHEN is_verified THEN 'Active'
                        ELSE 'Pending'
                    END AS status
             FROM users
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> Database {
        Database::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let db = db().await;
        let profile = ProfileFields {
            university: Some("JNTU Hyderabad".into()),
            gpa: Some(8.7),
            ..Default::default()
        };
        let id = db
            .create_user("Sruja", "sruja@example.com", None, &profile)
            .await
            .unwrap();

        let user = db.get_user_by_email("sruja@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.university.as_deref(), Some("JNTU Hyderabad"));
        assert_eq!(user.gpa, Some(8.7));
        assert!(!user.is_suspended);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let db = db().await;
        let profile = ProfileFields::default();
        db.create_user("A", "a@example.com", None, &profile).await.unwrap();
        let err = db
            .create_user("B", "a@example.com", None, &profile)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_unset_fields() {
        let db = db().await;
        let profile = ProfileFields {
            phone: Some("555".into()),
            bio: Some("old bio".into()),
            ..Default::default()
        };
        let id = db.create_user("A", "a@example.com", None, &profile).await.unwrap();

        let update = ProfileFields {
            bio: Some("new bio".into()),
            ..Default::default()
        };
        assert!(db.update_user(id, Some("Alice"), &update).await.unwrap());

        let user = db.get_user(id).await.unwrap().unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.phone.as_deref(), Some("555"));
        assert_eq!(user.bio.as_deref(), Some("new bio"));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let db = db().await;
        assert!(!db
            .update_user(42, Some("x"), &ProfileFields::default())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_existing() {
        let db = db().await;
        let first = db.get_or_create_user("g@example.com", "Guest").await.unwrap();
        let second = db.get_or_create_user("g@example.com", "Other").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Guest");
    }

    #[tokio::test]
    async fn test_recent_users_status() {
        let db = db().await;
        let profile = ProfileFields::default();
        let a = db.create_user("A", "a@example.com", None, &profile).await.unwrap();
        db.create_user("B", "b@example.com", None, &profile).await.unwrap();
        db.set_user_suspended(a, true).await.unwrap();

        let recent = db.recent_users(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].email, "b@example.com");
        assert_eq!(recent[0].status, "Pending");
        assert_eq!(recent[1].status, "Suspended");
    }

    #[tokio::test]
    async fn test_password_hash_not_serialized() {
        let db = db().await;
        let id = db
            .create_user("A", "a@example.com", Some("secret-hash"), &ProfileFields::default())
            .await
            .unwrap();
        let user = db.get_user(id).await.unwrap().unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(user.password_hash.as_deref(), Some("secret-hash"));
    }
}
