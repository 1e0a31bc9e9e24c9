use anyhow::Result;

use crate::storage::{Database, Interaction, NewsItem, PostFilter, Session};

/// Post queries with per-user enrichment.
///
/// Cheap to clone; background tasks take their own copy.
#[derive(Clone)]
pub struct ContentFetcher {
    db: Database,
    page_size: u32,
}

impl ContentFetcher {
    pub fn new(db: Database, page_size: u32) -> Self {
        Self { db, page_size }
    }

    /// Fetch a list of posts and mark the session user's likes and saves.
    ///
    /// # Arguments
    ///
    /// * `language` - Language code the posts are written in
    /// * `filter` - Category, trend or home predicate
    /// * `session` - Current session, if any; without one every flag is `false`
    ///
    /// # Errors
    ///
    /// Returns an error if the post query fails. A failed like/save lookup
    /// is logged and leaves the flags unset.
    pub async fn list(
        &self,
        language: &str,
        filter: &PostFilter,
        session: Option<&Session>,
    ) -> Result<Vec<NewsItem>> {
        let mut items = self.db.get_posts(language, filter, self.page_size).await?;
        if let Some(session) = session {
            self.enrich(&mut items, &session.user_id).await;
        }
        tracing::debug!(language = %language, count = items.len(), "Fetched news list");
        Ok(items)
    }

    /// Fetch one post by id or slug, enriched like [`ContentFetcher::list`].
    pub async fn single(
        &self,
        id_or_slug: &str,
        session: Option<&Session>,
    ) -> Result<Option<NewsItem>> {
        let Some(item) = self.db.get_post(id_or_slug).await? else {
            return Ok(None);
        };
        let mut items = [item];
        if let Some(session) = session {
            self.enrich(&mut items, &session.user_id).await;
        }
        let [item] = items;
        Ok(Some(item))
    }

    /// Toggle a like or save for the session user, returning the new state.
    pub async fn toggle(
        &self,
        session: &Session,
        post_id: &str,
        kind: Interaction,
    ) -> Result<bool> {
        self.db
            .toggle_interaction(&session.user_id, post_id, kind)
            .await
    }

    async fn enrich(&self, items: &mut [NewsItem], user_id: &str) {
        if items.is_empty() {
            return;
        }
        let ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();

        let (liked, saved) = tokio::join!(
            self.db.interacted_post_ids(user_id, &ids, Interaction::Like),
            self.db.interacted_post_ids(user_id, &ids, Interaction::Save),
        );

        match liked {
            Ok(liked) => {
                for item in items.iter_mut() {
                    item.liked = liked.contains(&item.id);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load liked posts"),
        }
        match saved {
            Ok(saved) => {
                for item in items.iter_mut() {
                    item.saved = saved.contains(&item.id);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load saved posts"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewPost, UserProfile};
    use std::collections::BTreeSet;

    async fn seeded() -> (Database, String, String) {
        let db = Database::open(":memory:").await.unwrap();
        let a = db
            .insert_post(&NewPost {
                title: "Maç sonucu".to_string(),
                category: Some("spor".to_string()),
                language_code: "tr".to_string(),
                published_at: 100,
                slug: Some("mac-sonucu".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let b = db
            .insert_post(&NewPost {
                title: "Faiz kararı".to_string(),
                category: Some("ekonomi".to_string()),
                language_code: "tr".to_string(),
                published_at: 200,
                ..Default::default()
            })
            .await
            .unwrap();
        db.upsert_profile(&UserProfile {
            id: "u1".to_string(),
            display_name: "Okur".to_string(),
            avatar_url: None,
            bio: None,
            role_id: None,
        })
        .await
        .unwrap();
        (db, a, b)
    }

    fn session() -> Session {
        Session {
            token: "t".to_string(),
            user_id: "u1".to_string(),
            display_name: Some("Okur".to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_without_session_has_no_flags() {
        let (db, a, _) = seeded().await;
        db.toggle_interaction("u1", &a, Interaction::Like).await.unwrap();

        let fetcher = ContentFetcher::new(db, 50);
        let items = fetcher.list("tr", &PostFilter::All, None).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.liked && !i.saved));
    }

    #[tokio::test]
    async fn test_list_enriches_for_session() {
        let (db, a, b) = seeded().await;
        db.toggle_interaction("u1", &a, Interaction::Like).await.unwrap();
        db.toggle_interaction("u1", &b, Interaction::Save).await.unwrap();

        let fetcher = ContentFetcher::new(db, 50);
        let items = fetcher
            .list("tr", &PostFilter::All, Some(&session()))
            .await
            .unwrap();
        let post_a = items.iter().find(|i| i.id == a).unwrap();
        let post_b = items.iter().find(|i| i.id == b).unwrap();
        assert!(post_a.liked && !post_a.saved);
        assert!(!post_b.liked && post_b.saved);
    }

    #[tokio::test]
    async fn test_list_applies_category_filter() {
        let (db, _, b) = seeded().await;
        let fetcher = ContentFetcher::new(db, 50);
        let filter = PostFilter::Categories(BTreeSet::from(["ekonomi".to_string()]));
        let items = fetcher.list("tr", &filter, None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, b);
    }

    #[tokio::test]
    async fn test_single_by_slug_and_toggle() {
        let (db, a, _) = seeded().await;
        let fetcher = ContentFetcher::new(db, 50);

        assert!(fetcher.toggle(&session(), &a, Interaction::Like).await.unwrap());
        let item = fetcher
            .single("mac-sonucu", Some(&session()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.id, a);
        assert!(item.liked);
        assert_eq!(item.likes_count, 1);

        assert!(fetcher.single("missing", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_fails_when_store_unreachable() {
        let (db, _, _) = seeded().await;
        db.close().await;
        let fetcher = ContentFetcher::new(db, 50);
        assert!(fetcher.list("tr", &PostFilter::All, None).await.is_err());
    }
}
