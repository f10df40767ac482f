use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub name: String,
    pub description: Option<String>,
    #[serde(default, alias = "technologies")]
    pub tech: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The list-valued parts of a profile, each stored in its own table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileLists {
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub achievements: Vec<String>,
    pub projects: Vec<Project>,
}

/// Tables holding one text value per row.
#[derive(Debug, Clone, Copy)]
enum ListTable {
    Skills,
    Interests,
    Achievements,
}

impl ListTable {
    fn table(self) -> &'static str {
        match self {
            ListTable::Skills => "user_skills",
            ListTable::Interests => "user_interests",
            ListTable::Achievements => "user_achievements",
        }
    }

    fn column(self) -> &'static str {
        match self {
            ListTable::Skills => "skill_name",
            ListTable::Interests => "interest_name",
            ListTable::Achievements => "achievement_text",
        }
    }
}

impl Database {
    pub async fn profile_lists(&self, user_id: i64) -> Result<ProfileLists, AppError> {
        Ok(ProfileLists {
            skills: self.list_values(ListTable::Skills, user_id).await?,
            interests: self.list_values(ListTable::Interests, user_id).await?,
            achievements: self.list_values(ListTable::Achievements, user_id).await?,
            projects: self.user_projects(user_id).await?,
        })
    }

    pub async fn replace_skills(&self, user_id: i64, skills: &[String]) -> Result<(), AppError> {
        self.replace_values(ListTable::Skills, user_id, skills).await
    }

    pub async fn replace_interests(
        &self,
        user_id: i64,
        interests: &[String],
    ) -> Result<(), AppError> {
        self.replace_values(ListTable::Interests, user_id, interests)
            .await
    }

    pub async fn replace_achievements(
        &self,
        user_id: i64,
        achievements: &[String],
    ) -> Result<(), AppError> {
        self.replace_values(ListTable::Achievements, user_id, achievements)
            .await
    }

    pub async fn user_projects(&self, user_id: i64) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT project_name AS name, description, technologies AS tech, project_url AS url
             FROM user_projects WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(projects)
    }

    pub async fn replace_projects(
        &self,
        user_id: i64,
        projects: &[Project],
    ) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM user_projects WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for project in projects.iter().filter(|p| !p.name.trim().is_empty()) {
            sqlx::query(
                "INSERT INTO user_projects (user_id, project_name, description, technologies, project_url)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(project.name.trim())
            .bind(&project.description)
            .bind(&project.tech)
            .bind(&project.url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Apply whichever lists are present, leaving the others alone.
    pub async fn apply_profile_lists(
        &self,
        user_id: i64,
        skills: Option<&[String]>,
        interests: Option<&[String]>,
        achievements: Option<&[String]>,
        projects: Option<&[Project]>,
    ) -> Result<(), AppError> {
        if let Some(skills) = skills {
            self.replace_skills(user_id, skills).await?;
        }
        if let Some(interests) = interests {
            self.replace_interests(user_id, interests).await?;
        }
        if let Some(achievements) = achievements {
            self.replace_achievements(user_id, achievements).await?;
        }
        if let Some(projects) = projects {
            self.replace_projects(user_id, projects).await?;
        }
        Ok(())
    }

    async fn list_values(&self, list: ListTable, user_id: i64) -> Result<Vec<String>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = ? ORDER BY id",
            list.column(),
            list.table()
        );
        let values = sqlx::query_scalar::<_, String>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        Ok(values)
    }

    async fn replace_values(
        &self,
        list: ListTable,
        user_id: i64,
        values: &[String],
    ) -> Result<(), AppError> {
        let delete = format!("DELETE FROM {} WHERE user_id = ?", list.table());
        let insert = format!(
            "INSERT INTO {} (user_id, {}) VALUES (?, ?)",
            list.table(),
            list.column()
        );

        let mut tx = self.pool().begin().await?;

        sqlx::query(&delete).bind(user_id).execute(&mut *tx).await?;

        for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            sqlx::query(&insert)
                .bind(user_id)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
