use anyhow::Result;
use std::collections::BTreeMap;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Language Pack Operations
    // ========================================================================

    /// The imported translation overlay for a language, flattened to dotted keys.
    pub async fn get_language_pack(
        &self,
        language_code: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT translations FROM language_packs WHERE language_code = ?")
                .bind(language_code)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((raw,)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Replace the overlay for a language.
    pub async fn save_language_pack(
        &self,
        language_code: &str,
        translations: &BTreeMap<String, String>,
    ) -> Result<()> {
        let raw = serde_json::to_string(translations)?;
        sqlx::query(
            r#"
            INSERT INTO language_packs (language_code, translations, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(language_code) DO UPDATE SET
                translations = excluded.translations,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(language_code)
        .bind(&raw)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Language codes that have an imported overlay.
    pub async fn language_pack_codes(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT language_code FROM language_packs ORDER BY language_code")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }
}
