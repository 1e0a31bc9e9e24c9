use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_message, DatabaseError};

// ============================================================================
// Database
// ============================================================================

/// Handle to the portal's data service.
///
/// Cloning is cheap (the pool is reference counted), so background fetch
/// tasks take their own clone.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another instance holds the lock.
    /// Returns `DatabaseError::Other` for other database errors.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::OpenOptionsExt;
            let db_path = std::path::Path::new(path);
            if !db_path.exists() {
                if let Some(parent) = db_path.parent().filter(|p| p.exists()) {
                    tracing::debug!(path = %path, parent = %parent.display(), "Pre-creating database file");
                    // Create with 0600 up front; if this fails SQLite reports it at connect time.
                    let _file = std::fs::OpenOptions::new()
                        .write(true)
                        .create_new(true)
                        .mode(0o600)
                        .open(db_path)
                        .ok();
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .foreign_keys(true);

        // In-memory databases are per-connection, so pin them to one connection.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Close every pooled connection. Subsequent queries fail, which is how
    /// an unreachable data service looks to callers.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All migrations use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // parent_id is deliberately not a foreign key: rows may use the
        // `root` sentinel instead of NULL.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS navigation_items (
                id TEXT PRIMARY KEY,
                parent_id TEXT,
                label TEXT NOT NULL,
                value TEXT,
                nav_type TEXT NOT NULL DEFAULT 'category',
                icon TEXT,
                order_index INTEGER NOT NULL DEFAULT 0,
                language_code TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_navigation_lang_order ON navigation_items(language_code, order_index)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                slug TEXT UNIQUE,
                title TEXT NOT NULL,
                summary TEXT,
                content TEXT,
                category TEXT,
                author_id TEXT,
                author_name TEXT,
                publisher_id TEXT,
                image_url TEXT,
                language_code TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                published_at INTEGER NOT NULL,
                likes_count INTEGER NOT NULL DEFAULT 0,
                comments_count INTEGER NOT NULL DEFAULT 0,
                shares_count INTEGER NOT NULL DEFAULT 0,
                views_count INTEGER NOT NULL DEFAULT 0,
                homepage_block TEXT
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Covers: WHERE language_code = ? [AND category IN (...)] ORDER BY published_at DESC
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_lang_published ON posts(language_code, published_at DESC)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category)")
            .execute(&mut *tx)
            .await?;

        for table in ["post_likes", "post_saves"] {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    user_id TEXT NOT NULL,
                    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    created_at INTEGER NOT NULL,
                    PRIMARY KEY (user_id, post_id)
                )
            "#
            ))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS site_settings (
                language_code TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stories (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                media_url TEXT NOT NULL,
                language_code TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roles (
                id TEXT PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                permissions TEXT NOT NULL DEFAULT '[]'
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                avatar_url TEXT,
                bio TEXT,
                role_id TEXT REFERENCES roles(id) ON DELETE SET NULL,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS publishers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                logo_url TEXT,
                website_url TEXT,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS language_packs (
                language_code TEXT PRIMARY KEY,
                translations TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Backing store for the persistent cache: raw `{data, ts}` envelopes
        // keyed by `<prefix><kind>_<language>`.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_runs_migrations() {
        let db = Database::open(":memory:").await.unwrap();
        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&db.pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for expected in [
            "kv_cache",
            "language_packs",
            "navigation_items",
            "posts",
            "profiles",
            "publishers",
            "roles",
            "sessions",
            "site_settings",
            "stories",
        ] {
            assert!(names.contains(&expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_database_rejects_queries() {
        let db = Database::open(":memory:").await.unwrap();
        db.close().await;
        let result: Result<(i64,), _> = sqlx::query_as("SELECT 1").fetch_one(&db.pool).await;
        assert!(result.is_err());
    }
}
