//! Conduit core - persistence layer for a social blogging backend
//!
//! This library maintains articles, tags, favorites, comments and follow
//! relationships against a SQLite store. It exposes no network surface;
//! the request-handling layer invokes the repositories in-process.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
