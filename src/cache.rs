//! Persistent read-through cache for instant first paint.
//!
//! Entries are JSON envelopes `{"data": ..., "ts": <unix millis>}` stored under
//! `<prefix><kind>_<language>`. Reads are synchronous against an in-memory
//! snapshot loaded once at startup; writes update the snapshot and are
//! written through to the backing `kv_cache` table.
//!
//! The cache is best-effort: a missing or unparsable entry is a miss, and a
//! failed write-through is logged and otherwise ignored. Entries never expire;
//! they are replaced by the next successful fetch. `ts` is exposed through
//! [`CachedEntry::age_millis`] for callers that want to judge staleness.
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::storage::Database;

// ============================================================================
// Cache Kinds
// ============================================================================

/// Logical content kind of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// News list for a category selector; `None` is the global home feed.
    News(Option<String>),
    Navigation,
    SiteSettings,
    Stories,
    /// Sticky root category remembered across returns to home.
    LastSelectedCategory,
}

impl CacheKind {
    fn key_part(&self) -> String {
        match self {
            CacheKind::News(None) => "news_home".to_string(),
            CacheKind::News(Some(category)) => format!("news_{category}"),
            CacheKind::Navigation => "navigation".to_string(),
            CacheKind::SiteSettings => "site_settings".to_string(),
            CacheKind::Stories => "stories".to_string(),
            CacheKind::LastSelectedCategory => "last_selected_category".to_string(),
        }
    }
}

// ============================================================================
// Entries
// ============================================================================

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    data: &'a T,
    ts: i64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    ts: i64,
}

/// A decoded cache entry with its write timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry<T> {
    pub data: T,
    /// Unix milliseconds at write time.
    pub ts: i64,
}

impl<T> CachedEntry<T> {
    /// Milliseconds since the entry was written (0 if the clock went backwards).
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        (now_millis - self.ts).max(0)
    }
}

// ============================================================================
// PersistentCache
// ============================================================================

/// Injected cache service: constructed once at startup and owned by `App`.
pub struct PersistentCache {
    prefix: String,
    language: String,
    entries: HashMap<String, String>,
    backend: Option<Database>,
}

impl PersistentCache {
    /// A cache with no backing store (tests, or when the database is unavailable).
    pub fn in_memory(prefix: &str, language: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            language: language.to_string(),
            entries: HashMap::new(),
            backend: None,
        }
    }

    /// Load every stored entry under `prefix` into memory.
    ///
    /// A failed load yields an empty (but still write-through) cache.
    pub async fn load(db: &Database, prefix: &str, language: &str) -> Self {
        let entries = match db.get_kv_by_prefix(prefix).await {
            Ok(rows) => rows.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load persistent cache, starting empty");
                HashMap::new()
            }
        };
        tracing::debug!(entries = entries.len(), "Persistent cache loaded");

        Self {
            prefix: prefix.to_string(),
            language: language.to_string(),
            entries,
            backend: Some(db.clone()),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Switch the namespace used by `get`/`set`. Entries for other languages stay stored.
    pub fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }

    /// Full storage key: `<prefix><kind>_<language>`.
    pub fn storage_key(&self, kind: &CacheKind, language: &str) -> String {
        format!("{}{}_{}", self.prefix, kind.key_part(), language)
    }

    /// Last stored payload for the current language, or `None` if absent or corrupt.
    pub fn get<T: DeserializeOwned>(&self, kind: &CacheKind) -> Option<T> {
        self.get_entry(kind).map(|entry| entry.data)
    }

    /// Like [`PersistentCache::get`] but keeps the write timestamp.
    pub fn get_entry<T: DeserializeOwned>(&self, kind: &CacheKind) -> Option<CachedEntry<T>> {
        self.get_entry_for_language(kind, &self.language)
    }

    pub fn get_entry_for_language<T: DeserializeOwned>(
        &self,
        kind: &CacheKind,
        language: &str,
    ) -> Option<CachedEntry<T>> {
        let key = self.storage_key(kind, language);
        let raw = self.entries.get(&key)?;
        match serde_json::from_str::<Envelope<T>>(raw) {
            Ok(envelope) => Some(CachedEntry {
                data: envelope.data,
                ts: envelope.ts,
            }),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Overwrite the entry for the current language.
    pub async fn set<T: Serialize>(&mut self, kind: &CacheKind, data: &T) {
        let language = self.language.clone();
        self.set_for_language(kind, &language, data).await;
    }

    /// Overwrite the entry for an explicit language, leaving other languages untouched.
    pub async fn set_for_language<T: Serialize>(
        &mut self,
        kind: &CacheKind,
        language: &str,
        data: &T,
    ) {
        let key = self.storage_key(kind, language);
        let envelope = EnvelopeRef {
            data,
            ts: chrono::Utc::now().timestamp_millis(),
        };
        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Some(db) = &self.backend {
            if let Err(e) = db.set_kv(&key, &raw).await {
                tracing::warn!(key = %key, error = %e, "Failed to persist cache entry");
            }
        }
        self.entries.insert(key, raw);
    }

    /// Drop the entry for the current language.
    pub async fn invalidate(&mut self, kind: &CacheKind) {
        let key = self.storage_key(kind, &self.language);
        if let Some(db) = &self.backend {
            if let Err(e) = db.delete_kv(&key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete cache entry");
            }
        }
        self.entries.remove(&key);
    }

    /// Insert a raw stored value, bypassing serialization.
    #[cfg(test)]
    pub(crate) fn insert_raw(&mut self, key: &str, raw: &str) {
        self.entries.insert(key.to_string(), raw.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_get_on_empty_cache_is_none() {
        let cache = PersistentCache::in_memory("p_", "tr");
        assert_eq!(cache.get::<Vec<String>>(&CacheKind::Navigation), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let mut cache = PersistentCache::in_memory("p_", "tr");
        cache
            .set(&CacheKind::Stories, &vec!["a".to_string()])
            .await;
        assert_eq!(
            cache.get::<Vec<String>>(&CacheKind::Stories),
            Some(vec!["a".to_string()])
        );
    }

    #[test]
    fn test_storage_key_shape() {
        let cache = PersistentCache::in_memory("haber_cache_", "tr");
        assert_eq!(
            cache.storage_key(&CacheKind::Navigation, "tr"),
            "haber_cache_navigation_tr"
        );
        assert_eq!(
            cache.storage_key(&CacheKind::News(Some("spor".to_string())), "en"),
            "haber_cache_news_spor_en"
        );
        assert_eq!(
            cache.storage_key(&CacheKind::News(None), "tr"),
            "haber_cache_news_home_tr"
        );
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let mut cache = PersistentCache::in_memory("p_", "tr");
        cache.insert_raw("p_navigation_tr", "{not json");
        assert_eq!(cache.get::<Vec<String>>(&CacheKind::Navigation), None);

        // Valid JSON but wrong shape is also a miss
        cache.insert_raw("p_stories_tr", r#"{"data": 42, "ts": 1}"#);
        assert_eq!(cache.get::<Vec<String>>(&CacheKind::Stories), None);
    }

    #[test]
    fn test_entry_without_ts_still_readable() {
        let mut cache = PersistentCache::in_memory("p_", "tr");
        cache.insert_raw("p_last_selected_category_tr", r#"{"data": "gundem"}"#);
        let entry = cache
            .get_entry::<String>(&CacheKind::LastSelectedCategory)
            .unwrap();
        assert_eq!(entry.data, "gundem");
        assert_eq!(entry.ts, 0);
    }

    #[tokio::test]
    async fn test_languages_are_namespaced() {
        let mut cache = PersistentCache::in_memory("p_", "tr");
        cache.set(&CacheKind::SiteSettings, &"tr-settings").await;
        cache.set_language("en");
        assert_eq!(cache.get::<String>(&CacheKind::SiteSettings), None);
        cache.set(&CacheKind::SiteSettings, &"en-settings").await;
        cache.set_language("tr");
        assert_eq!(
            cache.get::<String>(&CacheKind::SiteSettings).as_deref(),
            Some("tr-settings")
        );
    }

    #[tokio::test]
    async fn test_set_for_language_leaves_others_untouched() {
        let mut cache = PersistentCache::in_memory("p_", "tr");
        cache.set(&CacheKind::SiteSettings, &"tr-v1").await;
        cache
            .set_for_language(&CacheKind::SiteSettings, "en", &"en-v1")
            .await;
        assert_eq!(
            cache.get::<String>(&CacheKind::SiteSettings).as_deref(),
            Some("tr-v1")
        );
        let en = cache
            .get_entry_for_language::<String>(&CacheKind::SiteSettings, "en")
            .unwrap();
        assert_eq!(en.data, "en-v1");
    }

    #[tokio::test]
    async fn test_invalidate() {
        let mut cache = PersistentCache::in_memory("p_", "tr");
        cache
            .set(&CacheKind::LastSelectedCategory, &"gundem")
            .await;
        cache.invalidate(&CacheKind::LastSelectedCategory).await;
        assert_eq!(cache.get::<String>(&CacheKind::LastSelectedCategory), None);
    }

    #[tokio::test]
    async fn test_entry_age() {
        let mut cache = PersistentCache::in_memory("p_", "tr");
        cache.set(&CacheKind::Stories, &1).await;
        let entry = cache.get_entry::<i32>(&CacheKind::Stories).unwrap();
        let now = chrono::Utc::now().timestamp_millis();
        assert!(entry.age_millis(now) >= 0);
        assert_eq!(entry.age_millis(entry.ts - 100), 0);
    }

    #[tokio::test]
    async fn test_write_through_survives_reload() {
        let db = Database::open(":memory:").await.unwrap();
        let mut cache = PersistentCache::load(&db, "p_", "tr").await;
        cache.set(&CacheKind::Navigation, &vec![1, 2, 3]).await;

        let reloaded = PersistentCache::load(&db, "p_", "tr").await;
        assert_eq!(
            reloaded.get::<Vec<i32>>(&CacheKind::Navigation),
            Some(vec![1, 2, 3])
        );
    }

    #[tokio::test]
    async fn test_load_from_unreachable_store_is_empty() {
        let db = Database::open(":memory:").await.unwrap();
        db.close().await;
        let mut cache = PersistentCache::load(&db, "p_", "tr").await;
        assert_eq!(cache.get::<Vec<i32>>(&CacheKind::Navigation), None);

        // Writes still land in memory even though the backend fails
        cache.set(&CacheKind::Navigation, &vec![7]).await;
        assert_eq!(cache.get::<Vec<i32>>(&CacheKind::Navigation), Some(vec![7]));
    }
}
