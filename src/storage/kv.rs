use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Key/Value Cache Operations
    // ========================================================================

    /// Get a single raw cache value by key.
    pub async fn get_kv(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a raw cache value (UPSERT).
    pub async fn set_kv(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_cache (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a cache value. Missing keys are not an error.
    pub async fn delete_kv(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get all values whose key starts with `prefix`, ordered by key.
    ///
    /// Uses `substr` rather than `LIKE` so `_` and `%` in prefixes match literally.
    pub async fn get_kv_by_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM kv_cache WHERE substr(key, 1, ?) = ? ORDER BY key",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_kv_missing() {
        let db = test_db().await;
        assert_eq!(db.get_kv("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_kv_upsert() {
        let db = test_db().await;
        db.set_kv("haber_cache_navigation_tr", "{}").await.unwrap();
        db.set_kv("haber_cache_navigation_tr", "[]").await.unwrap();
        assert_eq!(
            db.get_kv("haber_cache_navigation_tr").await.unwrap(),
            Some("[]".to_string())
        );
    }

    #[tokio::test]
    async fn test_delete_kv() {
        let db = test_db().await;
        db.set_kv("k", "v").await.unwrap();
        db.delete_kv("k").await.unwrap();
        db.delete_kv("k").await.unwrap();
        assert_eq!(db.get_kv("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_kv_by_prefix_literal_underscore() {
        let db = test_db().await;
        db.set_kv("haber_cache_stories_tr", "1").await.unwrap();
        db.set_kv("haber_cache_stories_en", "2").await.unwrap();
        // `_` would be a LIKE wildcard; must not match here
        db.set_kv("haberXcacheXstories", "3").await.unwrap();
        db.set_kv("other_key", "4").await.unwrap();

        let rows = db.get_kv_by_prefix("haber_cache_").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "haber_cache_stories_en");
        assert_eq!(rows[1].0, "haber_cache_stories_tr");
    }
}
