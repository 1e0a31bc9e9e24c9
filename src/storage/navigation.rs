use anyhow::{bail, Result};

use super::schema::Database;
use super::types::{NavNode, NavRow, NavType, NewNavItem, ROOT_PARENT_SENTINEL};
use crate::util::strip_control_chars;

impl Database {
    // ========================================================================
    // Navigation Operations
    // ========================================================================

    /// Sanitize and validate a navigation label.
    ///
    /// Strips control characters, trims whitespace, and rejects empty names.
    fn sanitize_nav_label(label: &str) -> Result<String> {
        let sanitized = strip_control_chars(label);
        let trimmed = sanitized.trim();
        if trimmed.is_empty() {
            bail!("Navigation label cannot be empty or whitespace-only");
        }
        Ok(trimmed.to_owned())
    }

    /// Normalize the `root` sentinel and empty strings to `None`.
    fn normalize_parent(parent_id: Option<&str>) -> Option<&str> {
        parent_id.filter(|p| !p.is_empty() && *p != ROOT_PARENT_SENTINEL)
    }

    /// All navigation nodes for a language, ordered by `order_index` then label.
    /// Tree structure is assembled by `nav::NavigationTree` from `parent_id` links.
    pub async fn get_navigation(&self, language_code: &str) -> Result<Vec<NavNode>> {
        let rows: Vec<NavRow> = sqlx::query_as(
            r#"
            SELECT id, parent_id, label, value, nav_type, icon, order_index, language_code
            FROM navigation_items
            WHERE language_code = ?
            ORDER BY order_index, label
        "#,
        )
        .bind(language_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(NavRow::into_node).collect())
    }

    /// Create a navigation node, returning its ID.
    ///
    /// The parent, when given, must exist in the same language.
    pub async fn create_nav_item(&self, item: &NewNavItem) -> Result<String> {
        let label = Self::sanitize_nav_label(&item.label)?;
        let parent = Self::normalize_parent(item.parent_id.as_deref());

        if let Some(pid) = parent {
            let exists: Option<(String,)> = sqlx::query_as(
                "SELECT id FROM navigation_items WHERE id = ? AND language_code = ?",
            )
            .bind(pid)
            .bind(&item.language_code)
            .fetch_optional(&self.pool)
            .await?;
            if exists.is_none() {
                bail!("Parent navigation item '{pid}' does not exist");
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO navigation_items
                (id, parent_id, label, value, nav_type, icon, order_index, language_code)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&id)
        .bind(parent)
        .bind(&label)
        .bind(&item.value)
        .bind(item.nav_type.as_str())
        .bind(&item.icon)
        .bind(item.order_index)
        .bind(&item.language_code)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Update the display fields of a node. Structure changes go through
    /// [`Database::move_nav_item`] and [`Database::reorder_nav_items`].
    pub async fn update_nav_item(
        &self,
        id: &str,
        label: &str,
        value: Option<&str>,
        nav_type: NavType,
        icon: Option<&str>,
    ) -> Result<()> {
        let label = Self::sanitize_nav_label(label)?;
        sqlx::query(
            "UPDATE navigation_items SET label = ?, value = ?, nav_type = ?, icon = ? WHERE id = ?",
        )
        .bind(&label)
        .bind(value)
        .bind(nav_type.as_str())
        .bind(icon)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Re-parent a node. Moving a node under itself or one of its descendants
    /// is rejected since it would turn the forest into a cycle.
    pub async fn move_nav_item(&self, id: &str, new_parent: Option<&str>) -> Result<()> {
        let new_parent = Self::normalize_parent(new_parent);

        if let Some(pid) = new_parent {
            if self.nav_ancestor_ids(pid).await?.iter().any(|a| a == id) {
                bail!("Cannot move navigation item under its own descendant: would create a cycle");
            }
        }

        sqlx::query("UPDATE navigation_items SET parent_id = ? WHERE id = ?")
            .bind(new_parent)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Apply a batch of `(id, order_index)` pairs in one transaction.
    pub async fn reorder_nav_items(&self, order: &[(String, i64)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (id, index) in order {
            sqlx::query("UPDATE navigation_items SET order_index = ? WHERE id = ?")
                .bind(index)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete a node. Its children become roots.
    pub async fn delete_nav_item(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE navigation_items SET parent_id = NULL WHERE parent_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM navigation_items WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The node itself plus every ancestor id, walking `parent_id` upward.
    ///
    /// LIMIT 50 on the recursive CTE bounds the walk if corrupted data
    /// already contains a cycle.
    async fn nav_ancestor_ids(&self, id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            WITH RECURSIVE ancestors(id, parent_id) AS (
                SELECT id, parent_id FROM navigation_items WHERE id = ?
                UNION
                SELECT n.id, n.parent_id
                FROM navigation_items n
                JOIN ancestors a ON n.id = a.parent_id
                LIMIT 50
            )
            SELECT id FROM ancestors
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
