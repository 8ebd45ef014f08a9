//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity
///
/// Tag names are unique and case-sensitive; a tag row is created at most
/// once per distinct name and shared across articles via a join table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Unique tag name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Bumped whenever the name is reused by another article
    pub updated_at: DateTime<Utc>,
}
