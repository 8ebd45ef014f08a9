//! Article model
//!
//! This module provides:
//! - `Article` entity with its embedded author snapshot and tag set
//! - Input types for creating and updating articles
//! - `ArticleFilter` / `Pagination` for the dynamic listing query
//!
//! `favorites_count` is a cache: it must always equal the number of
//! favorite rows referencing the article, and is only ever adjusted inside
//! the same transaction as the membership row it mirrors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::models::{Tag, User};

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Article title
    pub title: String,
    /// Short description
    pub description: Option<String>,
    /// Article body
    pub body: String,
    /// Owning user ID
    pub author_id: i64,
    /// Cached favorite count, maintained with the favorite ledger
    pub favorites_count: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Author snapshot fetched alongside the article
    pub author: User,
    /// Tags attached at creation time
    pub tags: Vec<Tag>,
}

/// Input for creating an article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub body: String,
    pub author_id: i64,
    /// Free-text tag names; deduplicated and upserted on insert
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for updating an article (title/description/body only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateArticleInput {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub body: String,
}

impl CreateArticleInput {
    pub fn validate(&self) -> StoreResult<()> {
        validate_article_fields(&self.title, &self.body)
    }
}

impl UpdateArticleInput {
    pub fn validate(&self) -> StoreResult<()> {
        validate_article_fields(&self.title, &self.body)
    }
}

fn validate_article_fields(title: &str, body: &str) -> StoreResult<()> {
    if title.trim().is_empty() {
        return Err(StoreError::Validation("title must not be empty".into()));
    }
    if body.trim().is_empty() {
        return Err(StoreError::Validation("body must not be empty".into()));
    }
    Ok(())
}

/// Optional predicates for the article listing query.
///
/// All present predicates are combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Author username equality
    pub author: Option<String>,
    /// Tag name equality
    pub tag: Option<String>,
    /// Only articles favorited by this user
    pub favorited_by: Option<i64>,
}

/// Listing pagination, applied after all predicates.
///
/// An absent `limit` means no limit; `offset` always applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: i64,
}

/// Refreshed counter state returned by favorite/unfavorite so the caller
/// never needs a second read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCount {
    pub favorites_count: i64,
    pub updated_at: DateTime<Utc>,
}
