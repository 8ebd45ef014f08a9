//! User repository
//!
//! Database operations for users and the follow relation.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait over SQLite

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::error::{StoreError, StoreResult};
use crate::models::{CreateUserInput, UpdateUserInput, User};

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, input: &CreateUserInput) -> StoreResult<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> StoreResult<User>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> StoreResult<User>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> StoreResult<User>;

    /// Update all mutable fields of a user
    async fn update(&self, input: &UpdateUserInput) -> StoreResult<User>;

    /// Check whether `follower_id` follows `followee_id`.
    /// Any absent side means no relation, not an error.
    async fn is_following(
        &self,
        follower_id: Option<i64>,
        followee_id: Option<i64>,
    ) -> StoreResult<bool>;

    /// Record that `follower_id` follows `followee_id`
    async fn follow(&self, follower_id: i64, followee_id: i64) -> StoreResult<()>;

    /// Remove the follow relation
    async fn unfollow(&self, follower_id: i64, followee_id: i64) -> StoreResult<()>;

    /// IDs of all users `follower_id` follows, in the order the
    /// relations were created
    async fn following_ids(&self, follower_id: i64) -> StoreResult<Vec<i64>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: SqlitePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, input: &CreateUserInput) -> StoreResult<User> {
        input.validate()?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, name, bio, image, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.name)
        .bind(&input.bio)
        .bind(&input.image)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: input.username.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            name: input.name.clone(),
            bio: input.bio.clone(),
            image: input.image.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<User> {
        let mut conn = self.pool.acquire().await?;
        fetch_user_by_id(&mut conn, id).await
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, name, bio, image, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_user(&r)).ok_or(StoreError::NotFound)
    }

    async fn get_by_username(&self, username: &str) -> StoreResult<User> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, name, bio, image, created_at, updated_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_user(&r)).ok_or(StoreError::NotFound)
    }

    async fn update(&self, input: &UpdateUserInput) -> StoreResult<User> {
        input.validate()?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, password_hash = ?, name = ?, bio = ?, image = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.name)
        .bind(&input.bio)
        .bind(&input.image)
        .bind(now)
        .bind(input.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let mut conn = self.pool.acquire().await?;
        fetch_user_by_id(&mut conn, input.id).await
    }

    async fn is_following(
        &self,
        follower_id: Option<i64>,
        followee_id: Option<i64>,
    ) -> StoreResult<bool> {
        let (Some(follower_id), Some(followee_id)) = (follower_id, followee_id) else {
            return Ok(false);
        };

        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM follows WHERE from_user_id = ? AND to_user_id = ?",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn follow(&self, follower_id: i64, followee_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT INTO follows (from_user_id, to_user_id, created_at) VALUES (?, ?, ?)")
            .bind(follower_id)
            .bind(followee_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        tracing::debug!(follower_id, followee_id, "recorded follow");

        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, followee_id: i64) -> StoreResult<()> {
        let result =
            sqlx::query("DELETE FROM follows WHERE from_user_id = ? AND to_user_id = ?")
                .bind(follower_id)
                .bind(followee_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn following_ids(&self, follower_id: i64) -> StoreResult<Vec<i64>> {
        let rows = sqlx::query(
            r#"
            SELECT to_user_id
            FROM follows
            WHERE from_user_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(follower_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("to_user_id")).collect())
    }
}

/// Fetch a user by id on an existing connection.
///
/// Shared with the article and comment repositories so author rows can be
/// read inside their transactions.
pub(crate) async fn fetch_user_by_id(conn: &mut SqliteConnection, id: i64) -> StoreResult<User> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, name, bio, image, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|r| row_to_user(&r)).ok_or(StoreError::NotFound)
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        bio: row.get("bio"),
        image: row.get("image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (SqlitePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    fn create_test_input(username: &str, email: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash123".to_string(),
            name: String::new(),
            bio: String::new(),
            image: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_user() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&create_test_input("alice", "alice@example.com"))
            .await
            .expect("Failed to create user");

        assert!(created.id > 0);
        assert_eq!(created.username, "alice");
        assert_eq!(created.email, "alice@example.com");
        assert_eq!(created.bio, "");
    }

    #[tokio::test]
    async fn test_create_user_duplicate_username() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&create_test_input("alice", "alice@example.com"))
            .await
            .expect("Failed to create user");

        let err = repo
            .create(&create_test_input("alice", "other@example.com"))
            .await
            .expect_err("Duplicate username should fail");

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&create_test_input("alice", "alice@example.com"))
            .await
            .expect("Failed to create user");

        let err = repo
            .create(&create_test_input("bob", "alice@example.com"))
            .await
            .expect_err("Duplicate email should fail");

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_create_user_invalid_username() {
        let (_pool, repo) = setup_test_repo().await;

        let err = repo
            .create(&create_test_input("has space", "x@example.com"))
            .await
            .expect_err("Invalid username should fail");

        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_input("alice", "alice@example.com"))
            .await
            .expect("Failed to create user");

        let found = repo.get_by_id(created.id).await.expect("Failed to get user");
        assert_eq!(found.id, created.id);
        assert_eq!(found.username, "alice");
    }

    #[tokio::test]
    async fn test_get_user_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let err = repo.get_by_id(99999).await.expect_err("Should be missing");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_user_by_email_and_username() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_input("alice", "alice@example.com"))
            .await
            .expect("Failed to create user");

        let by_email = repo
            .get_by_email("alice@example.com")
            .await
            .expect("Failed to get by email");
        let by_username = repo
            .get_by_username("alice")
            .await
            .expect("Failed to get by username");

        assert_eq!(by_email.id, by_username.id);
    }

    #[tokio::test]
    async fn test_update_user() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_input("alice", "alice@example.com"))
            .await
            .expect("Failed to create user");

        let updated = repo
            .update(&UpdateUserInput {
                id: created.id,
                username: "alice2".to_string(),
                email: "alice2@example.com".to_string(),
                password_hash: "newhash".to_string(),
                name: "Alice".to_string(),
                bio: "Hi there".to_string(),
                image: "https://example.com/a.png".to_string(),
            })
            .await
            .expect("Failed to update user");

        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.bio, "Hi there");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_user_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let err = repo
            .update(&UpdateUserInput {
                id: 99999,
                username: "ghost".to_string(),
                email: "ghost@example.com".to_string(),
                password_hash: "hash".to_string(),
                name: String::new(),
                bio: String::new(),
                image: String::new(),
            })
            .await
            .expect_err("Missing user should fail");

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_is_following_absent_sides() {
        let (_pool, repo) = setup_test_repo().await;

        assert!(!repo.is_following(None, None).await.unwrap());
        assert!(!repo.is_following(Some(1), None).await.unwrap());
        assert!(!repo.is_following(None, Some(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let (_pool, repo) = setup_test_repo().await;
        let alice = repo
            .create(&create_test_input("alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = repo
            .create(&create_test_input("bob", "bob@example.com"))
            .await
            .unwrap();

        assert!(!repo
            .is_following(Some(alice.id), Some(bob.id))
            .await
            .unwrap());

        repo.follow(alice.id, bob.id).await.expect("Failed to follow");
        assert!(repo
            .is_following(Some(alice.id), Some(bob.id))
            .await
            .unwrap());
        // Direction matters
        assert!(!repo
            .is_following(Some(bob.id), Some(alice.id))
            .await
            .unwrap());

        repo.unfollow(alice.id, bob.id)
            .await
            .expect("Failed to unfollow");
        assert!(!repo
            .is_following(Some(alice.id), Some(bob.id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_follow_duplicate_conflict() {
        let (_pool, repo) = setup_test_repo().await;
        let alice = repo
            .create(&create_test_input("alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = repo
            .create(&create_test_input("bob", "bob@example.com"))
            .await
            .unwrap();

        repo.follow(alice.id, bob.id).await.unwrap();
        let err = repo
            .follow(alice.id, bob.id)
            .await
            .expect_err("Duplicate follow should fail");

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_unfollow_not_following() {
        let (_pool, repo) = setup_test_repo().await;
        let alice = repo
            .create(&create_test_input("alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = repo
            .create(&create_test_input("bob", "bob@example.com"))
            .await
            .unwrap();

        let err = repo
            .unfollow(alice.id, bob.id)
            .await
            .expect_err("Unfollow without relation should fail");

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_following_ids_insertion_order() {
        let (_pool, repo) = setup_test_repo().await;
        let alice = repo
            .create(&create_test_input("alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = repo
            .create(&create_test_input("bob", "bob@example.com"))
            .await
            .unwrap();
        let carol = repo
            .create(&create_test_input("carol", "carol@example.com"))
            .await
            .unwrap();

        repo.follow(alice.id, carol.id).await.unwrap();
        repo.follow(alice.id, bob.id).await.unwrap();

        let ids = repo
            .following_ids(alice.id)
            .await
            .expect("Failed to list following");
        assert_eq!(ids, vec![carol.id, bob.id]);
    }
}
