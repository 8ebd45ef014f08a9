//! Comment repository
//!
//! Database operations for comments. Comments always carry their author row
//! so callers never need a second lookup.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::db::repositories::user::fetch_user_by_id;
use crate::error::{StoreError, StoreResult};
use crate::models::{Comment, CreateCommentInput, User};

const COMMENT_WITH_AUTHOR_COLUMNS: &str = "\
    c.id, c.body, c.user_id, c.article_id, c.created_at, c.updated_at, \
    u.id AS u_id, u.username, u.email, u.password_hash, u.name, u.bio, u.image, \
    u.created_at AS u_created_at, u.updated_at AS u_updated_at";

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment on an article
    async fn create(&self, input: &CreateCommentInput) -> StoreResult<Comment>;

    /// Get comment by ID, with author
    async fn get_by_id(&self, id: i64) -> StoreResult<Comment>;

    /// Get all comments on an article, newest first
    async fn get_by_article_id(&self, article_id: i64) -> StoreResult<Vec<Comment>>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> StoreResult<()>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: SqlitePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> StoreResult<Comment> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO comments (body, user_id, article_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.body)
        .bind(input.author_id)
        .bind(input.article_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        let author = fetch_user_by_id(&mut tx, input.author_id).await?;
        tx.commit().await?;

        Ok(Comment {
            id,
            body: input.body.clone(),
            author_id: input.author_id,
            article_id: input.article_id,
            created_at: now,
            updated_at: now,
            author,
        })
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Comment> {
        let mut conn = self.pool.acquire().await?;
        fetch_comment_by_id(&mut conn, id).await
    }

    async fn get_by_article_id(&self, article_id: i64) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_WITH_AUTHOR_COLUMNS} \
             FROM comments c \
             INNER JOIN users u ON u.id = c.user_id \
             WHERE c.article_id = ? \
             ORDER BY c.created_at DESC, c.id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(article_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_comment).collect())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

async fn fetch_comment_by_id(conn: &mut SqliteConnection, id: i64) -> StoreResult<Comment> {
    let sql = format!(
        "SELECT {COMMENT_WITH_AUTHOR_COLUMNS} \
         FROM comments c \
         INNER JOIN users u ON u.id = c.user_id \
         WHERE c.id = ?"
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| row_to_comment(&r)).ok_or(StoreError::NotFound)
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        body: row.get("body"),
        author_id: row.get("user_id"),
        article_id: row.get("article_id"),
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
    }
}
