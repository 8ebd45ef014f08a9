//! User model
//!
//! This module provides:
//! - `User` entity including the opaque password hash
//! - Input types for creating and updating users
//!
//! The password hash is produced and verified by an external collaborator;
//! the store treats it as an opaque string and never sees a plaintext.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z0-9_-]{1,40}$").expect("valid username pattern"));

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Unique, pattern-constrained handle
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Opaque hash from the password-hashing collaborator
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Display name
    pub name: String,
    /// Profile bio
    pub bio: String,
    /// Avatar image URL
    pub image: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: String,
}

/// Input for updating a user by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserInput {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub bio: String,
    pub image: String,
}

impl CreateUserInput {
    pub fn validate(&self) -> StoreResult<()> {
        validate_user_fields(&self.username, &self.email)
    }
}

impl UpdateUserInput {
    pub fn validate(&self) -> StoreResult<()> {
        validate_user_fields(&self.username, &self.email)
    }
}

fn validate_user_fields(username: &str, email: &str) -> StoreResult<()> {
    if !USERNAME_PATTERN.is_match(username) {
        return Err(StoreError::Validation(format!(
            "invalid username: {username}"
        )));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(StoreError::Validation(format!("invalid email: {email}")));
    }
    Ok(())
}
