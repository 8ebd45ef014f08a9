//! Data models
//!
//! Entities persisted by the store (User, Article, Tag, Comment) plus the
//! input and filter types the repositories accept.

mod article;
mod comment;
mod tag;
mod user;

pub use article::{
    Article, ArticleFilter, CreateArticleInput, FavoriteCount, Pagination, UpdateArticleInput,
};
pub use comment::{Comment, CreateCommentInput};
pub use tag::Tag;
pub use user::{CreateUserInput, UpdateUserInput, User};
