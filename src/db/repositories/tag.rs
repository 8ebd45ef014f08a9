//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait over SQLite
//! - `link_tags`, the shared upsert path used by article creation
//!
//! Tag names are case-sensitive and globally unique. Attaching a name that
//! already exists reuses the existing row and only bumps its `updated_at`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::error::StoreResult;
use crate::models::Tag;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// List all tags
    async fn list(&self) -> StoreResult<Vec<Tag>>;

    /// Get tags for an article
    async fn get_by_article_id(&self, article_id: i64) -> StoreResult<Vec<Tag>>;

    /// Get tags for a batch of articles, keyed by article ID.
    /// Articles with no tags are absent from the map.
    async fn get_by_article_ids(&self, article_ids: &[i64])
        -> StoreResult<HashMap<i64, Vec<Tag>>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: SqlitePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn list(&self) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, created_at, updated_at
            FROM tags
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_tag).collect())
    }

    async fn get_by_article_id(&self, article_id: i64) -> StoreResult<Vec<Tag>> {
        let mut conn = self.pool.acquire().await?;
        tags_for_article(&mut conn, article_id).await
    }

    async fn get_by_article_ids(
        &self,
        article_ids: &[i64],
    ) -> StoreResult<HashMap<i64, Vec<Tag>>> {
        let mut conn = self.pool.acquire().await?;
        tags_for_articles(&mut conn, article_ids).await
    }
}

/// Attach a list of free-text tag names to an article on an existing
/// connection, creating tag rows as needed.
///
/// Names are trimmed, empty names dropped, and duplicates collapsed to
/// their first occurrence before any row is touched. Returns the attached
/// tags in that order.
pub(crate) async fn link_tags(
    conn: &mut SqliteConnection,
    article_id: i64,
    names: &[String],
) -> StoreResult<Vec<Tag>> {
    let mut seen = Vec::new();
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }

    let now = Utc::now();
    let mut tags = Vec::with_capacity(seen.len());

    for name in &seen {
        // Upsert keeps a single row per name even when two creates race
        sqlx::query(
            r#"
            INSERT INTO tags (name, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM tags WHERE name = ?",
        )
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
        let tag = row_to_tag(&row);

        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag.id)
            .execute(&mut *conn)
            .await?;

        tags.push(tag);
    }

    Ok(tags)
}

/// Fetch the tags attached to one article on an existing connection
pub(crate) async fn tags_for_article(
    conn: &mut SqliteConnection,
    article_id: i64,
) -> StoreResult<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.created_at, t.updated_at
        FROM tags t
        INNER JOIN article_tags at ON t.id = at.tag_id
        WHERE at.article_id = ?
        ORDER BY t.id
        "#,
    )
    .bind(article_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(row_to_tag).collect())
}

/// Fetch tags for a batch of articles in one query
pub(crate) async fn tags_for_articles(
    conn: &mut SqliteConnection,
    article_ids: &[i64],
) -> StoreResult<HashMap<i64, Vec<Tag>>> {
    if article_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        r#"
        SELECT at.article_id, t.id, t.name, t.created_at, t.updated_at
        FROM tags t
        INNER JOIN article_tags at ON t.id = at.tag_id
        WHERE at.article_id IN ({})
        ORDER BY t.id
        "#,
        placeholders(article_ids.len())
    );

    let mut query = sqlx::query(&sql);
    for id in article_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    let mut map: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in rows {
        let article_id: i64 = row.get("article_id");
        map.entry(article_id).or_default().push(row_to_tag(&row));
    }

    Ok(map)
}

/// Build a `?, ?, ...` placeholder list for IN clauses
pub(crate) fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 3);
    for i in 0..n {
        if i > 0 {
            s.push_str(", ");
        }
        s.push('?');
    }
    s
}

fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_pool() -> SqlitePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    async fn create_test_user(pool: &SqlitePool, username: &str) -> i64 {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(format!("{username}@example.com"))
        .bind("hash123")
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to create test user");
        result.last_insert_rowid()
    }

    async fn create_test_article(pool: &SqlitePool, author_id: i64, title: &str) -> i64 {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO articles (title, body, user_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title)
        .bind("Body")
        .bind(author_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to create test article");
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn test_link_tags_dedupes_batch() {
        let pool = setup_test_pool().await;
        let user_id = create_test_user(&pool, "author").await;
        let article_id = create_test_article(&pool, user_id, "First").await;

        let mut conn = pool.acquire().await.unwrap();
        let tags = link_tags(
            &mut conn,
            article_id,
            &[
                "rust".to_string(),
                "  rust  ".to_string(),
                "".to_string(),
                "sqlite".to_string(),
            ],
        )
        .await
        .expect("Failed to link tags");

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "rust");
        assert_eq!(tags[1].name, "sqlite");
    }

    #[tokio::test]
    async fn test_link_tags_reuses_existing_row() {
        let pool = setup_test_pool().await;
        let user_id = create_test_user(&pool, "author").await;
        let first = create_test_article(&pool, user_id, "First").await;
        let second = create_test_article(&pool, user_id, "Second").await;

        let mut conn = pool.acquire().await.unwrap();
        let a = link_tags(&mut conn, first, &["golang".to_string()])
            .await
            .unwrap();
        let b = link_tags(&mut conn, second, &["golang".to_string()])
            .await
            .unwrap();

        drop(conn);

        assert_eq!(a[0].id, b[0].id);

        let row = sqlx::query("SELECT COUNT(*) as count FROM tags WHERE name = 'golang'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_link_tags_case_sensitive() {
        let pool = setup_test_pool().await;
        let user_id = create_test_user(&pool, "author").await;
        let article_id = create_test_article(&pool, user_id, "First").await;

        let mut conn = pool.acquire().await.unwrap();
        let tags = link_tags(
            &mut conn,
            article_id,
            &["Rust".to_string(), "rust".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(tags.len(), 2);
        assert_ne!(tags[0].id, tags[1].id);
    }

    #[tokio::test]
    async fn test_get_by_article_id() {
        let pool = setup_test_pool().await;
        let user_id = create_test_user(&pool, "author").await;
        let article_id = create_test_article(&pool, user_id, "First").await;

        let mut conn = pool.acquire().await.unwrap();
        link_tags(
            &mut conn,
            article_id,
            &["one".to_string(), "two".to_string()],
        )
        .await
        .unwrap();
        drop(conn);

        let repo = SqlxTagRepository::new(pool.clone());
        let tags = repo
            .get_by_article_id(article_id)
            .await
            .expect("Failed to get tags");

        assert_eq!(tags.len(), 2);
    }

    #[tokio::test]
    async fn test_get_by_article_ids_batched() {
        let pool = setup_test_pool().await;
        let user_id = create_test_user(&pool, "author").await;
        let first = create_test_article(&pool, user_id, "First").await;
        let second = create_test_article(&pool, user_id, "Second").await;
        let third = create_test_article(&pool, user_id, "Third").await;

        let mut conn = pool.acquire().await.unwrap();
        link_tags(&mut conn, first, &["shared".to_string(), "a".to_string()])
            .await
            .unwrap();
        link_tags(&mut conn, second, &["shared".to_string()])
            .await
            .unwrap();
        drop(conn);

        let repo = SqlxTagRepository::new(pool.clone());
        let map = repo
            .get_by_article_ids(&[first, second, third])
            .await
            .expect("Failed to batch tags");

        assert_eq!(map.get(&first).map(Vec::len), Some(2));
        assert_eq!(map.get(&second).map(Vec::len), Some(1));
        assert!(!map.contains_key(&third));
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let pool = setup_test_pool().await;
        let user_id = create_test_user(&pool, "author").await;
        let article_id = create_test_article(&pool, user_id, "First").await;

        let mut conn = pool.acquire().await.unwrap();
        link_tags(
            &mut conn,
            article_id,
            &["zebra".to_string(), "apple".to_string()],
        )
        .await
        .unwrap();
        drop(conn);

        let repo = SqlxTagRepository::new(pool.clone());
        let tags = repo.list().await.expect("Failed to list tags");

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "apple");
        assert_eq!(tags[1].name, "zebra");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
