//! Database layer
//!
//! Connection pool setup, schema migrations, and the repository
//! implementations that make up the store's public surface.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use migrations::run_migrations;
pub use pool::{create_pool, create_test_pool};
