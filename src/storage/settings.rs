use anyhow::Result;

use super::schema::Database;
use super::types::{SiteSettings, Story};

impl Database {
    // ========================================================================
    // Site Settings
    // ========================================================================

    /// Settings for one language, or `None` when the language has none stored.
    pub async fn get_site_settings(&self, language_code: &str) -> Result<Option<SiteSettings>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM site_settings WHERE language_code = ?")
                .bind(language_code)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((payload,)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Upsert settings for `settings.language_code`.
    pub async fn save_site_settings(&self, settings: &SiteSettings) -> Result<()> {
        let payload = serde_json::to_string(settings)?;
        sqlx::query(
            r#"
            INSERT INTO site_settings (language_code, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(language_code) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
        "#,
        )
        .bind(&settings.language_code)
        .bind(&payload)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ========================================================================
    // Stories
    // ========================================================================

    /// Stories for a language that have not expired at `now`, newest first.
    pub async fn get_stories(&self, language_code: &str, now: i64) -> Result<Vec<Story>> {
        let stories: Vec<Story> = sqlx::query_as(
            r#"
            SELECT id, title, media_url, language_code, created_at, expires_at
            FROM stories
            WHERE language_code = ? AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY created_at DESC
        "#,
        )
        .bind(language_code)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(stories)
    }

    /// Insert a story, returning its ID.
    pub async fn insert_story(
        &self,
        title: &str,
        media_url: &str,
        language_code: &str,
        expires_at: Option<i64>,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO stories (id, title, media_url, language_code, created_at, expires_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(title)
        .bind(media_url)
        .bind(language_code)
        .bind(chrono::Utc::now().timestamp())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }
}
