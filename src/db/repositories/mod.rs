//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the reads and writes for a specific entity and
//! returns [`RepoError`](crate::error::RepoError) on failure.

pub mod article;
pub mod comment;
pub mod tag;
pub mod user;

use crate::db::DynDatabasePool;
use std::sync::Arc;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// The full set of repositories, bound to one shared pool
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub articles: Arc<dyn ArticleRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self {
            users: SqlxUserRepository::boxed(pool.clone()),
            articles: SqlxArticleRepository::boxed(pool.clone()),
            tags: SqlxTagRepository::boxed(pool.clone()),
            comments: SqlxCommentRepository::boxed(pool),
        }
    }
}
