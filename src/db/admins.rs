use serde::Serialize;

use super::Database;
use crate::error::{is_unique_violation, AppError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Admin {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminSessionRecord {
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMetrics {
    pub users_count: i64,
    pub new_signups_today: i64,
    pub content_uploaded: i64,
    pub downloads_count: i64,
    pub suspended_users: i64,
}

impl Database {
    pub async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO admins (name, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Admin with email '{}' already exists", email))
            } else {
                AppError::Database(e)
            }
        })?;

        let id = result.last_insert_rowid();
        tracing::info!("Created admin {} ({})", id, email);
        Ok(id)
    }

    pub async fn find_active_admin(&self, email: &str) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT * FROM admins WHERE email = ? AND is_active",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(admin)
    }

    pub async fn record_admin_login(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE admins SET last_login = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Issue a bearer token valid for `ttl_hours`.
    pub async fn create_admin_session(
        &self,
        admin_id: i64,
        ttl_hours: i64,
    ) -> Result<AdminSessionRecord, AppError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let modifier = format!("+{} hours", ttl_hours.max(1));

        let expires_at: String = sqlx::query_scalar(
            "INSERT INTO admin_sessions (token, admin_id, expires_at)
             VALUES (?, ?, datetime('now', ?))
             RETURNING expires_at",
        )
        .bind(&token)
        .bind(admin_id)
        .bind(&modifier)
        .fetch_one(self.pool())
        .await?;

        Ok(AdminSessionRecord { token, expires_at })
    }

    /// The active admin owning an unexpired session `token`.
    pub async fn resolve_admin_session(&self, token: &str) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT a.* FROM admin_sessions s
             JOIN admins a ON a.id = s.admin_id
             WHERE s.token = ? AND s.expires_at > CURRENT_TIMESTAMP AND a.is_active",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await?;
        Ok(admin)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let result =
            sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= CURRENT_TIMESTAMP")
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn admin_metrics(&self) -> Result<AdminMetrics, AppError> {
        let (users_count, new_signups_today, suspended_users): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(date(created_at) = date('now')), 0),
                    COALESCE(SUM(is_suspended), 0)
             FROM users",
        )
        .fetch_one(self.pool())
        .await?;

        Ok(AdminMetrics {
            users_count,
            new_signups_today,
            content_uploaded: self.count_history().await?,
            downloads_count: self.count_downloads().await?,
            suspended_users,
        })
    }
}
