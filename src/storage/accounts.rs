use anyhow::{bail, Result};
use std::collections::BTreeSet;

use super::schema::Database;
use super::types::{Role, Session, UserProfile};
use crate::util::strip_control_chars;

impl Database {
    // ========================================================================
    // Sessions
    // ========================================================================

    /// The most recently issued unexpired session, if any.
    ///
    /// Sign-in itself happens at the external auth service; this is the
    /// accessor the portal reads at boot.
    pub async fn current_session(&self, now: i64) -> Result<Option<Session>> {
        let row: Option<(String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT s.token, s.user_id, p.display_name
            FROM sessions s
            LEFT JOIN profiles p ON p.id = s.user_id
            WHERE s.expires_at > ?
            ORDER BY s.created_at DESC, s.rowid DESC
            LIMIT 1
        "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(token, user_id, display_name)| Session {
            token,
            user_id,
            display_name,
        }))
    }

    /// Record a session issued for `user_id`, valid for `ttl_secs`.
    pub async fn create_session(&self, user_id: &str, ttl_secs: i64) -> Result<String> {
        let token = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(now)
        .bind(now + ttl_secs.max(1))
        .execute(&self.pool)
        .await?;
        Ok(token)
    }

    pub async fn end_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    /// Insert or update a profile. The display name is sanitized.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        let name = strip_control_chars(&profile.display_name);
        let name = name.trim();
        if name.is_empty() {
            bail!("Display name cannot be empty");
        }

        sqlx::query(
            r#"
            INSERT INTO profiles (id, display_name, avatar_url, bio, role_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                bio = excluded.bio,
                role_id = excluded.role_id
        "#,
        )
        .bind(&profile.id)
        .bind(name)
        .bind(&profile.avatar_url)
        .bind(&profile.bio)
        .bind(&profile.role_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as(
            "SELECT id, display_name, avatar_url, bio, role_id FROM profiles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    /// Case-insensitive lookup by display name (public `/user/<name>` routes).
    pub async fn find_profile_by_name(&self, name: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as(
            r#"
            SELECT id, display_name, avatar_url, bio, role_id FROM profiles
            WHERE display_name = ? COLLATE NOCASE
            ORDER BY created_at LIMIT 1
        "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let profiles = sqlx::query_as(
            "SELECT id, display_name, avatar_url, bio, role_id FROM profiles ORDER BY display_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// Insert or update a role and its permission set.
    pub async fn upsert_role(&self, role: &Role) -> Result<()> {
        let permissions = serde_json::to_string(&role.permissions)?;
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, permissions) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, permissions = excluded.permissions
        "#,
        )
        .bind(&role.id)
        .bind(&role.name)
        .bind(&permissions)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT id, name, permissions FROM roles ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Self::role_from_row).collect()
    }

    /// Delete a role. Profiles holding it fall back to no role.
    pub async fn delete_role(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The role assigned to a user, if any.
    pub async fn role_for_user(&self, user_id: &str) -> Result<Option<Role>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT r.id, r.name, r.permissions
            FROM profiles p JOIN roles r ON r.id = p.role_id
            WHERE p.id = ?
        "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::role_from_row).transpose()
    }

    fn role_from_row((id, name, permissions): (String, String, String)) -> Result<Role> {
        let permissions: BTreeSet<String> = serde_json::from_str(&permissions)?;
        Ok(Role {
            id,
            name,
            permissions,
        })
    }
}
