//! Data models
//!
//! This module contains the entities persisted by the blog backend:
//! - `User` (authors of articles and comments)
//! - `Article` (blog posts, soft-deletable)
//! - `Tag` (labels, soft-deletable, many-to-many with articles)
//! - `Comment` (soft-deletable, belongs to one article and one user)
//! - `ArticleTag` (join row between articles and tags)

mod article;
mod comment;
mod tag;
mod user;

pub use article::{Article, ArticleTag};
pub use comment::Comment;
pub use tag::Tag;
pub use user::User;
