use anyhow::Result;
use sqlx::QueryBuilder;
use std::collections::HashSet;

use super::schema::Database;
use super::types::{NewPost, NewsItem, PostFilter, PostRow};

/// Hard cap on rows returned by any single list query.
const MAX_POSTS: u32 = 500;

/// Bind-parameter chunk size for `IN (...)` lookups.
const CHUNK_SIZE: usize = 500;

const POST_COLUMNS: &str = "id, slug, title, summary, content, category, author_id, author_name, \
     publisher_id, image_url, language_code, created_at, published_at, likes_count, \
     comments_count, shares_count, views_count, homepage_block";

/// Which per-user interaction table to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Like,
    Save,
}

impl Interaction {
    fn table(&self) -> &'static str {
        match self {
            Interaction::Like => "post_likes",
            Interaction::Save => "post_saves",
        }
    }
}

impl Database {
    // ========================================================================
    // Post Queries
    // ========================================================================

    /// List posts for a language under a filter, newest first (or by trend metric).
    ///
    /// `limit` is clamped to `MAX_POSTS`. An empty category set matches nothing.
    pub async fn get_posts(
        &self,
        language_code: &str,
        filter: &PostFilter,
        limit: u32,
    ) -> Result<Vec<NewsItem>> {
        let limit = limit.min(MAX_POSTS);
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE language_code = "));
        builder.push_bind(language_code);

        match filter {
            PostFilter::All => {
                builder.push(" ORDER BY published_at DESC");
            }
            PostFilter::Categories(values) => {
                if values.is_empty() {
                    return Ok(Vec::new());
                }
                builder.push(" AND category IN (");
                let mut separated = builder.separated(", ");
                for value in values {
                    separated.push_bind(value);
                }
                separated.push_unseparated(")");
                builder.push(" ORDER BY published_at DESC");
            }
            PostFilter::Trending { since, metric } => {
                builder.push(" AND published_at >= ");
                builder.push_bind(*since);
                builder.push(" ORDER BY ");
                builder.push(metric.order_expr());
                builder.push(" DESC, published_at DESC");
            }
        }

        builder.push(" LIMIT ");
        builder.push_bind(i64::from(limit));

        let rows: Vec<PostRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(PostRow::into_news_item).collect())
    }

    /// Fetch a single post by id, falling back to slug.
    pub async fn get_post(&self, id_or_slug: &str) -> Result<Option<NewsItem>> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ? OR slug = ? \
             ORDER BY CASE WHEN id = ? THEN 0 ELSE 1 END LIMIT 1"
        ))
        .bind(id_or_slug)
        .bind(id_or_slug)
        .bind(id_or_slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PostRow::into_news_item))
    }

    /// Insert a post, returning its generated id.
    pub async fn insert_post(&self, post: &NewPost) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        let block = post
            .homepage_block
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, slug, title, summary, content, category, author_id,
                author_name, publisher_id, image_url, language_code, created_at,
                published_at, homepage_block)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&id)
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.summary)
        .bind(&post.content)
        .bind(&post.category)
        .bind(&post.author_id)
        .bind(&post.author_name)
        .bind(&post.publisher_id)
        .bind(&post.image_url)
        .bind(&post.language_code)
        .bind(now)
        .bind(post.published_at)
        .bind(block)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Delete a post. Likes and saves cascade.
    pub async fn delete_post(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Increment the read counter of a post.
    pub async fn record_view(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE posts SET views_count = views_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Likes and Saves
    // ========================================================================

    /// Return the subset of `post_ids` the user has liked or saved.
    ///
    /// Chunks at 500 ids per query to stay under SQLite bind-parameter limits.
    pub async fn interacted_post_ids(
        &self,
        user_id: &str,
        post_ids: &[String],
        kind: Interaction,
    ) -> Result<HashSet<String>> {
        let mut result = HashSet::new();
        if post_ids.is_empty() {
            return Ok(result);
        }

        for chunk in post_ids.chunks(CHUNK_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
                "SELECT post_id FROM {} WHERE user_id = ",
                kind.table()
            ));
            builder.push_bind(user_id);
            builder.push(" AND post_id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");

            let rows: Vec<(String,)> = builder.build_query_as().fetch_all(&self.pool).await?;
            result.extend(rows.into_iter().map(|(id,)| id));
        }

        Ok(result)
    }

    /// Toggle a like or save for the user. Returns the new state.
    ///
    /// Likes also move the post's `likes_count` in the same transaction.
    pub async fn toggle_interaction(
        &self,
        user_id: &str,
        post_id: &str,
        kind: Interaction,
    ) -> Result<bool> {
        let table = kind.table();
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(&format!(
            "DELETE FROM {table} WHERE user_id = ? AND post_id = ?"
        ))
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !removed {
            sqlx::query(&format!(
                "INSERT INTO {table} (user_id, post_id, created_at) VALUES (?, ?, ?)"
            ))
            .bind(user_id)
            .bind(post_id)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
        }

        if kind == Interaction::Like {
            let delta: i64 = if removed { -1 } else { 1 };
            sqlx::query("UPDATE posts SET likes_count = MAX(0, likes_count + ?) WHERE id = ?")
                .bind(delta)
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(!removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{HomepageBlock, TrendMetric};
    use std::collections::BTreeSet;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn post(title: &str, category: &str, published_at: i64) -> NewPost {
        NewPost {
            title: title.to_string(),
            category: Some(category.to_string()),
            language_code: "tr".to_string(),
            published_at,
            ..NewPost::default()
        }
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_posts_all_newest_first() {
        let db = test_db().await;
        db.insert_post(&post("Old", "spor", 100)).await.unwrap();
        db.insert_post(&post("New", "ekonomi", 200)).await.unwrap();

        let posts = db.get_posts("tr", &PostFilter::All, 50).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "New");
        assert_eq!(posts[1].title, "Old");
    }

    #[tokio::test]
    async fn test_get_posts_filters_language() {
        let db = test_db().await;
        db.insert_post(&post("TR", "spor", 100)).await.unwrap();
        let mut en = post("EN", "sports", 100);
        en.language_code = "en".to_string();
        db.insert_post(&en).await.unwrap();

        let posts = db.get_posts("en", &PostFilter::All, 50).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "EN");
    }

    #[tokio::test]
    async fn test_get_posts_category_set() {
        let db = test_db().await;
        db.insert_post(&post("A", "kadikoy", 100)).await.unwrap();
        db.insert_post(&post("B", "istanbul", 110)).await.unwrap();
        db.insert_post(&post("C", "ankara", 120)).await.unwrap();

        let filter = PostFilter::Categories(set(&["istanbul", "İstanbul", "kadikoy"]));
        let posts = db.get_posts("tr", &filter, 50).await.unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_get_posts_empty_category_set_matches_nothing() {
        let db = test_db().await;
        db.insert_post(&post("A", "spor", 100)).await.unwrap();
        let posts = db
            .get_posts("tr", &PostFilter::Categories(BTreeSet::new()), 50)
            .await
            .unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_get_posts_trending_window_and_metric() {
        let db = test_db().await;
        let quiet = db.insert_post(&post("Quiet", "spor", 1000)).await.unwrap();
        let popular = db.insert_post(&post("Popular", "spor", 1001)).await.unwrap();
        db.insert_post(&post("Ancient", "spor", 10)).await.unwrap();

        db.toggle_interaction("u1", &popular, Interaction::Like)
            .await
            .unwrap();
        db.toggle_interaction("u2", &popular, Interaction::Like)
            .await
            .unwrap();
        db.toggle_interaction("u1", &quiet, Interaction::Like)
            .await
            .unwrap();

        let filter = PostFilter::Trending {
            since: 500,
            metric: TrendMetric::Likes,
        };
        let posts = db.get_posts("tr", &filter, 50).await.unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Popular", "Quiet"]);
    }

    #[tokio::test]
    async fn test_get_posts_limit() {
        let db = test_db().await;
        for i in 0..5 {
            db.insert_post(&post(&format!("P{i}"), "spor", i)).await.unwrap();
        }
        let posts = db.get_posts("tr", &PostFilter::All, 2).await.unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_get_post_by_id_and_slug() {
        let db = test_db().await;
        let mut p = post("Sluggy", "spor", 100);
        p.slug = Some("sluggy-haber".to_string());
        let id = db.insert_post(&p).await.unwrap();

        let by_id = db.get_post(&id).await.unwrap().unwrap();
        assert_eq!(by_id.title, "Sluggy");
        let by_slug = db.get_post("sluggy-haber").await.unwrap().unwrap();
        assert_eq!(by_slug.id, id);
        assert!(db.get_post("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_homepage_block_persisted() {
        let db = test_db().await;
        let mut p = post("Gallery", "spor", 100);
        p.homepage_block = Some(HomepageBlock::Gallery {
            images: vec!["a.jpg".to_string()],
            caption: None,
        });
        let id = db.insert_post(&p).await.unwrap();
        let item = db.get_post(&id).await.unwrap().unwrap();
        assert_eq!(item.homepage_block, p.homepage_block);
    }

    #[tokio::test]
    async fn test_malformed_homepage_block_is_dropped() {
        let db = test_db().await;
        let id = db.insert_post(&post("Broken", "spor", 100)).await.unwrap();
        sqlx::query("UPDATE posts SET homepage_block = '{not json' WHERE id = ?")
            .bind(&id)
            .execute(&db.pool)
            .await
            .unwrap();
        let item = db.get_post(&id).await.unwrap().unwrap();
        assert!(item.homepage_block.is_none());
    }

    #[tokio::test]
    async fn test_toggle_like_updates_counter() {
        let db = test_db().await;
        let id = db.insert_post(&post("Liked", "spor", 100)).await.unwrap();

        assert!(db.toggle_interaction("u1", &id, Interaction::Like).await.unwrap());
        assert_eq!(db.get_post(&id).await.unwrap().unwrap().likes_count, 1);

        assert!(!db.toggle_interaction("u1", &id, Interaction::Like).await.unwrap());
        assert_eq!(db.get_post(&id).await.unwrap().unwrap().likes_count, 0);
    }

    #[tokio::test]
    async fn test_interacted_post_ids() {
        let db = test_db().await;
        let a = db.insert_post(&post("A", "spor", 100)).await.unwrap();
        let b = db.insert_post(&post("B", "spor", 101)).await.unwrap();

        db.toggle_interaction("u1", &b, Interaction::Save).await.unwrap();

        let ids = vec![a.clone(), b.clone()];
        let saved = db
            .interacted_post_ids("u1", &ids, Interaction::Save)
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved.contains(&b));

        let liked = db
            .interacted_post_ids("u1", &ids, Interaction::Like)
            .await
            .unwrap();
        assert!(liked.is_empty());

        let none = db
            .interacted_post_ids("u1", &[], Interaction::Like)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_post_cascades_interactions() {
        let db = test_db().await;
        let id = db.insert_post(&post("Gone", "spor", 100)).await.unwrap();
        db.toggle_interaction("u1", &id, Interaction::Save).await.unwrap();

        assert!(db.delete_post(&id).await.unwrap());
        let saved = db
            .interacted_post_ids("u1", &[id.clone()], Interaction::Save)
            .await
            .unwrap();
        assert!(saved.is_empty());
    }

    #[tokio::test]
    async fn test_record_view() {
        let db = test_db().await;
        let id = db.insert_post(&post("Read", "spor", 100)).await.unwrap();
        db.record_view(&id).await.unwrap();
        db.record_view(&id).await.unwrap();
        assert_eq!(db.get_post(&id).await.unwrap().unwrap().views_count, 2);
    }
}
