//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::models::User;

/// Comment entity, scoped to one article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier
    pub id: i64,
    /// Comment body
    pub body: String,
    /// Owning user ID
    pub author_id: i64,
    /// Owning article ID
    pub article_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Author snapshot fetched alongside the comment
    pub author: User,
}

/// Input for creating a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub body: String,
    pub author_id: i64,
    pub article_id: i64,
}

impl CreateCommentInput {
    pub fn validate(&self) -> StoreResult<()> {
        if self.body.trim().is_empty() {
            return Err(StoreError::Validation("body must not be empty".into()));
        }
        Ok(())
    }
}
