//! Article repository
//!
//! Database operations for articles and the favorite ledger.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait over SQLite
//!
//! Every read returns the article together with its author row and tag set.
//! Listing composes optional predicates (author, tag, favorited-by) into a
//! single query; all predicates are ANDed and results are ordered newest
//! first with the row id as tiebreaker so pagination stays stable.
//!
//! The favorite operations keep `articles.favorites_count` in lockstep with
//! the `favorite_articles` membership table by updating both inside one
//! transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::db::repositories::tag::{link_tags, placeholders, tags_for_article, tags_for_articles};
use crate::db::repositories::user::fetch_user_by_id;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Article, ArticleFilter, CreateArticleInput, FavoriteCount, Pagination, Tag, UpdateArticleInput,
    User,
};

const ARTICLE_WITH_AUTHOR_COLUMNS: &str = "\
    a.id, a.title, a.description, a.body, a.user_id, a.favorites_count, \
    a.created_at, a.updated_at, \
    u.id AS u_id, u.username, u.email, u.password_hash, u.name, u.bio, u.image, \
    u.created_at AS u_created_at, u.updated_at AS u_updated_at";

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Create a new article with its tags, atomically
    async fn create(&self, input: &CreateArticleInput) -> StoreResult<Article>;

    /// Get article by ID, with author and tags
    async fn get_by_id(&self, id: i64) -> StoreResult<Article>;

    /// Update title, description, and body of an article
    async fn update(&self, input: &UpdateArticleInput) -> StoreResult<Article>;

    /// Delete an article; dependent rows are removed with it
    async fn delete(&self, id: i64) -> StoreResult<()>;

    /// List articles matching the filter, newest first
    async fn list(&self, filter: &ArticleFilter, page: &Pagination) -> StoreResult<Vec<Article>>;

    /// List articles authored by any of the given users, newest first.
    /// An empty author set yields an empty page.
    async fn feed(&self, author_ids: &[i64], page: &Pagination) -> StoreResult<Vec<Article>>;

    /// Check whether `user_id` has favorited `article_id`.
    /// Any absent side means not favorited, not an error.
    async fn is_favorited(
        &self,
        article_id: Option<i64>,
        user_id: Option<i64>,
    ) -> StoreResult<bool>;

    /// Record a favorite and bump the cached counter, returning its
    /// refreshed state
    async fn add_favorite(&self, article_id: i64, user_id: i64) -> StoreResult<FavoriteCount>;

    /// Remove a favorite and decrement the cached counter, returning its
    /// refreshed state. The caller is expected to have checked that the
    /// favorite exists.
    async fn remove_favorite(&self, article_id: i64, user_id: i64) -> StoreResult<FavoriteCount>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: SqlitePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

/// A deferred bind value for dynamically assembled queries
enum Bind {
    Int(i64),
    Text(String),
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, input: &CreateArticleInput) -> StoreResult<Article> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, description, body, user_id, favorites_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(input.description.as_deref())
        .bind(&input.body)
        .bind(input.author_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        let author = fetch_user_by_id(&mut tx, input.author_id).await?;
        let tags = link_tags(&mut tx, id, &input.tags).await?;

        tx.commit().await?;
        tracing::debug!(article_id = id, author_id = input.author_id, "created article");

        Ok(Article {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            body: input.body.clone(),
            author_id: input.author_id,
            favorites_count: 0,
            created_at: now,
            updated_at: now,
            author,
            tags,
        })
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Article> {
        let mut conn = self.pool.acquire().await?;
        fetch_article_by_id(&mut conn, id).await
    }

    async fn update(&self, input: &UpdateArticleInput) -> StoreResult<Article> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, description = ?, body = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(input.description.as_deref())
        .bind(&input.body)
        .bind(now)
        .bind(input.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let article = fetch_article_by_id(&mut tx, input.id).await?;
        tx.commit().await?;

        Ok(article)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        // Comments, tag links, and favorites go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(article_id = id, "deleted article");

        Ok(())
    }

    async fn list(&self, filter: &ArticleFilter, page: &Pagination) -> StoreResult<Vec<Article>> {
        let mut conn = self.pool.acquire().await?;

        let mut joins = String::new();
        let mut clauses: Vec<String> = Vec::new();
        let mut binds: Vec<Bind> = Vec::new();

        if let Some(author) = &filter.author {
            clauses.push("u.username = ?".to_string());
            binds.push(Bind::Text(author.clone()));
        }

        if let Some(tag) = &filter.tag {
            joins.push_str(
                " INNER JOIN article_tags at ON at.article_id = a.id \
                 INNER JOIN tags t ON t.id = at.tag_id",
            );
            clauses.push("t.name = ?".to_string());
            binds.push(Bind::Text(tag.clone()));
        }

        if let Some(user_id) = filter.favorited_by {
            let ids = favorited_article_ids(&mut conn, user_id).await?;
            if ids.is_empty() {
                // ANDed with an empty set, the result is provably empty
                return Ok(Vec::new());
            }
            clauses.push(format!("a.id IN ({})", placeholders(ids.len())));
            binds.extend(ids.into_iter().map(Bind::Int));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let mut sql = format!(
            "SELECT {ARTICLE_WITH_AUTHOR_COLUMNS} \
             FROM articles a \
             INNER JOIN users u ON u.id = a.user_id\
             {joins}{where_clause} \
             ORDER BY a.created_at DESC, a.id DESC"
        );
        append_pagination(&mut sql, &mut binds, page);

        fetch_article_page(&mut conn, &sql, &binds).await
    }

    async fn feed(&self, author_ids: &[i64], page: &Pagination) -> StoreResult<Vec<Article>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.acquire().await?;

        let mut binds: Vec<Bind> = author_ids.iter().copied().map(Bind::Int).collect();
        let mut sql = format!(
            "SELECT {ARTICLE_WITH_AUTHOR_COLUMNS} \
             FROM articles a \
             INNER JOIN users u ON u.id = a.user_id \
             WHERE a.user_id IN ({}) \
             ORDER BY a.created_at DESC, a.id DESC",
            placeholders(author_ids.len())
        );
        append_pagination(&mut sql, &mut binds, page);

        fetch_article_page(&mut conn, &sql, &binds).await
    }

    async fn is_favorited(
        &self,
        article_id: Option<i64>,
        user_id: Option<i64>,
    ) -> StoreResult<bool> {
        let (Some(article_id), Some(user_id)) = (article_id, user_id) else {
            return Ok(false);
        };

        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM favorite_articles WHERE article_id = ? AND user_id = ?",
        )
        .bind(article_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn add_favorite(&self, article_id: i64, user_id: i64) -> StoreResult<FavoriteCount> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE articles SET favorites_count = favorites_count + 1, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(article_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        // A duplicate favorite trips the primary key here and rolls the
        // counter bump back with the transaction
        sqlx::query(
            "INSERT INTO favorite_articles (article_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(article_id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let count = fetch_favorite_count(&mut tx, article_id).await?;
        tx.commit().await?;

        Ok(count)
    }

    async fn remove_favorite(&self, article_id: i64, user_id: i64) -> StoreResult<FavoriteCount> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE articles SET favorites_count = MAX(0, favorites_count - 1), updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(article_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM favorite_articles WHERE article_id = ? AND user_id = ?")
            .bind(article_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let count = fetch_favorite_count(&mut tx, article_id).await?;
        tx.commit().await?;

        Ok(count)
    }
}

/// Append LIMIT/OFFSET to an assembled query
fn append_pagination(sql: &mut String, binds: &mut Vec<Bind>, page: &Pagination) {
    match page.limit {
        Some(limit) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            binds.push(Bind::Int(limit));
            binds.push(Bind::Int(page.offset));
        }
        // SQLite needs a LIMIT clause to accept OFFSET; -1 means unbounded
        None if page.offset > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            binds.push(Bind::Int(page.offset));
        }
        None => {}
    }
}

/// Run an assembled article page query and attach tags in one batch
async fn fetch_article_page(
    conn: &mut SqliteConnection,
    sql: &str,
    binds: &[Bind],
) -> StoreResult<Vec<Article>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            Bind::Int(v) => query.bind(*v),
            Bind::Text(s) => query.bind(s.clone()),
        };
    }
    let rows = query.fetch_all(&mut *conn).await?;

    let mut articles: Vec<Article> = rows.iter().map(row_to_article).collect();

    let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
    let mut tag_map = tags_for_articles(conn, &ids).await?;
    for article in &mut articles {
        if let Some(tags) = tag_map.remove(&article.id) {
            article.tags = tags;
        }
    }

    Ok(articles)
}

/// Fetch one article with author and tags on an existing connection
async fn fetch_article_by_id(conn: &mut SqliteConnection, id: i64) -> StoreResult<Article> {
    let sql = format!(
        "SELECT {ARTICLE_WITH_AUTHOR_COLUMNS} \
         FROM articles a \
         INNER JOIN users u ON u.id = a.user_id \
         WHERE a.id = ?"
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let mut article = row.map(|r| row_to_article(&r)).ok_or(StoreError::NotFound)?;
    article.tags = tags_for_article(conn, id).await?;

    Ok(article)
}

/// Read the refreshed counter state after a ledger change
async fn fetch_favorite_count(
    conn: &mut SqliteConnection,
    article_id: i64,
) -> StoreResult<FavoriteCount> {
    let row = sqlx::query("SELECT favorites_count, updated_at FROM articles WHERE id = ?")
        .bind(article_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(FavoriteCount {
        favorites_count: row.get("favorites_count"),
        updated_at: row.get("updated_at"),
    })
}

/// IDs of all articles a user has favorited
async fn favorited_article_ids(conn: &mut SqliteConnection, user_id: i64) -> StoreResult<Vec<i64>> {
    let rows = sqlx::query("SELECT article_id FROM favorite_articles WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.iter().map(|row| row.get("article_id")).collect())
}

fn row_to_article(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        body: row.get("body"),
        author_id: row.get("user_id"),
        favorites_count: row.get("favorites_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        author: User {
            id: row.get("u_id"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            name: row.get("name"),
            bio: row.get("bio"),
            image: row.get("image"),
            created_at: row.get("u_created_at"),
            updated_at: row.get("u_updated_at"),
        },
        tags: Vec::<Tag>::new(),
    }
}
