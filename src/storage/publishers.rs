use anyhow::{bail, Result};

use super::schema::Database;
use super::types::Publisher;
use crate::util::strip_control_chars;

impl Database {
    // ========================================================================
    // Publisher Operations
    // ========================================================================

    pub async fn list_publishers(&self) -> Result<Vec<Publisher>> {
        let publishers = sqlx::query_as(
            "SELECT id, name, logo_url, website_url FROM publishers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(publishers)
    }

    pub async fn get_publisher(&self, id: &str) -> Result<Option<Publisher>> {
        let publisher = sqlx::query_as(
            "SELECT id, name, logo_url, website_url FROM publishers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(publisher)
    }

    /// Insert or update a publisher. The name is sanitized and must be non-empty.
    pub async fn upsert_publisher(&self, publisher: &Publisher) -> Result<()> {
        let name = strip_control_chars(&publisher.name);
        let name = name.trim();
        if name.is_empty() {
            bail!("Publisher name cannot be empty");
        }

        sqlx::query(
            r#"
            INSERT INTO publishers (id, name, logo_url, website_url, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                logo_url = excluded.logo_url,
                website_url = excluded.website_url
        "#,
        )
        .bind(&publisher.id)
        .bind(name)
        .bind(&publisher.logo_url)
        .bind(&publisher.website_url)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a publisher. Posts keep their (now dangling) publisher id.
    pub async fn delete_publisher(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM publishers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
