//! GraphQL object types
//!
//! Each object wraps a model. `User` never exposes the password.

use async_graphql::{Context, Object, Result, ID};
use chrono::{DateTime, Utc};

use super::schema::GraphQLContext;
use super::{optional, to_graphql_error};
use crate::models::{Article, Comment, Tag, User};

/// GraphQL representation of a User
#[derive(Clone)]
pub struct UserObject {
    pub inner: User,
}

impl From<User> for UserObject {
    fn from(user: User) -> Self {
        Self { inner: user }
    }
}

#[Object(name = "User")]
impl UserObject {
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.inner.name
    }

    async fn email(&self) -> &str {
        &self.inner.email
    }

    async fn avatar(&self) -> &str {
        &self.inner.avatar
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.inner.updated_at
    }

    /// Published articles written by this user, newest first
    async fn articles(&self, ctx: &Context<'_>) -> Result<Vec<ArticleObject>> {
        let context = ctx.data::<GraphQLContext>()?;
        let articles = context
            .repos
            .articles
            .list_by_author(self.inner.id)
            .await
            .map_err(to_graphql_error)?;
        Ok(articles.into_iter().map(ArticleObject::from).collect())
    }
}

/// GraphQL representation of an Article
#[derive(Clone)]
pub struct ArticleObject {
    pub inner: Article,
}

impl From<Article> for ArticleObject {
    fn from(article: Article) -> Self {
        Self { inner: article }
    }
}

#[Object(name = "Article")]
impl ArticleObject {
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    async fn title(&self) -> &str {
        &self.inner.title
    }

    /// Markdown body
    async fn content(&self) -> &str {
        &self.inner.content
    }

    async fn excerpt(&self) -> &str {
        &self.inner.excerpt
    }

    async fn slug(&self) -> &str {
        &self.inner.slug
    }

    /// `null` for drafts
    async fn published_at(&self) -> Option<DateTime<Utc>> {
        self.inner.published_at
    }

    async fn author(&self, ctx: &Context<'_>) -> Result<Option<UserObject>> {
        if let Some(author) = &self.inner.author {
            return Ok(Some(author.clone().into()));
        }
        let context = ctx.data::<GraphQLContext>()?;
        let author = optional(context.repos.users.find_by_id(self.inner.author_id).await)?;
        Ok(author.map(UserObject::from))
    }

    async fn tags(&self) -> Vec<TagObject> {
        self.inner.tags.iter().cloned().map(TagObject::from).collect()
    }

    /// Live comments, oldest first
    async fn comments(&self, ctx: &Context<'_>) -> Result<Vec<CommentObject>> {
        if let Some(comments) = &self.inner.comments {
            return Ok(comments.iter().cloned().map(CommentObject::from).collect());
        }
        let context = ctx.data::<GraphQLContext>()?;
        let comments = context
            .repos
            .comments
            .list_by_article(self.inner.id)
            .await
            .map_err(to_graphql_error)?;
        Ok(comments.into_iter().map(CommentObject::from).collect())
    }

    /// Estimated reading time in minutes
    async fn reading_time(&self) -> i32 {
        i32::try_from(self.inner.reading_time_minutes()).unwrap_or(i32::MAX)
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.inner.updated_at
    }
}

/// GraphQL representation of a Tag
#[derive(Clone)]
pub struct TagObject {
    pub inner: Tag,
}

impl From<Tag> for TagObject {
    fn from(tag: Tag) -> Self {
        Self { inner: tag }
    }
}

#[Object(name = "Tag")]
impl TagObject {
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.inner.name
    }
}

/// GraphQL representation of a Comment
#[derive(Clone)]
pub struct CommentObject {
    pub inner: Comment,
}

impl From<Comment> for CommentObject {
    fn from(comment: Comment) -> Self {
        Self { inner: comment }
    }
}

#[Object(name = "Comment")]
impl CommentObject {
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    async fn content(&self) -> &str {
        &self.inner.content
    }

    async fn author(&self, ctx: &Context<'_>) -> Result<Option<UserObject>> {
        if let Some(user) = &self.inner.user {
            return Ok(Some(user.clone().into()));
        }
        let context = ctx.data::<GraphQLContext>()?;
        let user = optional(context.repos.users.find_by_id(self.inner.user_id).await)?;
        Ok(user.map(UserObject::from))
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }
}
