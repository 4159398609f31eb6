use async_graphql::{Context, InputObject, Object, Result, ID};
use chrono::Utc;

use super::schema::GraphQLContext;
use super::types::{ArticleObject, CommentObject, UserObject};
use super::{optional, parse_id, to_graphql_error};
use crate::error::RepoError;
use crate::models::{Article, Comment, User};

#[derive(InputObject)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

#[derive(InputObject)]
pub struct CreateArticleInput {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub slug: String,
    pub author_id: ID,
    /// Tag names; missing tags are created
    #[graphql(default)]
    pub tags: Vec<String>,
    /// Publish immediately instead of saving a draft
    #[graphql(default)]
    pub publish: bool,
}

#[derive(InputObject)]
pub struct CreateCommentInput {
    pub content: String,
    pub article_id: ID,
    pub user_id: ID,
}

/// Normalize requested tag names: trimmed, non-empty, first occurrence wins
fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if !seen.iter().any(|s: &String| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// `true` when the row was deleted, `false` when it did not exist
fn deleted(result: std::result::Result<(), RepoError>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(to_graphql_error(err)),
    }
}

/// Root mutation object for GraphQL
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_user(&self, ctx: &Context<'_>, input: CreateUserInput) -> Result<UserObject> {
        let context = ctx.data::<GraphQLContext>()?;
        let user = User::new(
            input.name,
            input.email,
            input.password,
            input.avatar.unwrap_or_default(),
        );

        let created = context
            .repos
            .users
            .create(&user)
            .await
            .map_err(to_graphql_error)?;
        tracing::info!(user_id = %created.id, "User created");
        Ok(created.into())
    }

    async fn create_article(
        &self,
        ctx: &Context<'_>,
        input: CreateArticleInput,
    ) -> Result<ArticleObject> {
        let context = ctx.data::<GraphQLContext>()?;
        let repos = &context.repos;
        let author_id = parse_id(&input.author_id)?;

        repos
            .users
            .find_by_id(author_id)
            .await
            .map_err(to_graphql_error)?;

        let mut article = Article::new(
            input.title,
            input.content,
            input.excerpt.unwrap_or_default(),
            input.slug,
            author_id,
        );
        if input.publish {
            article.publish(Utc::now());
        }

        let created = repos
            .articles
            .create(&article)
            .await
            .map_err(to_graphql_error)?;

        for name in normalize_tag_names(&input.tags) {
            let tag = repos.tags.find_or_create(&name).await.map_err(to_graphql_error)?;
            repos
                .articles
                .attach_tag(created.id, tag.id)
                .await
                .map_err(to_graphql_error)?;
        }

        tracing::info!(article_id = %created.id, slug = %created.slug, "Article created");

        let article = repos
            .articles
            .find_by_id(created.id)
            .await
            .map_err(to_graphql_error)?;
        Ok(article.into())
    }

    /// Publish a draft now. Returns `null` if the article does not exist.
    async fn publish_article(&self, ctx: &Context<'_>, id: ID) -> Result<Option<ArticleObject>> {
        let context = ctx.data::<GraphQLContext>()?;
        let id = parse_id(&id)?;

        let Some(mut article) = optional(context.repos.articles.find_by_id(id).await)? else {
            return Ok(None);
        };
        article.publish(Utc::now());

        let updated = context
            .repos
            .articles
            .update(&article)
            .await
            .map_err(to_graphql_error)?;
        Ok(Some(updated.into()))
    }

    /// Soft-delete an article
    async fn delete_article(&self, ctx: &Context<'_>, id: ID) -> Result<bool> {
        let context = ctx.data::<GraphQLContext>()?;
        let id = parse_id(&id)?;
        deleted(context.repos.articles.soft_delete(id).await)
    }

    async fn create_comment(
        &self,
        ctx: &Context<'_>,
        input: CreateCommentInput,
    ) -> Result<CommentObject> {
        let context = ctx.data::<GraphQLContext>()?;
        let article_id = parse_id(&input.article_id)?;
        let user_id = parse_id(&input.user_id)?;

        // Comments on soft-deleted articles are rejected
        context
            .repos
            .articles
            .find_by_id(article_id)
            .await
            .map_err(to_graphql_error)?;
        context
            .repos
            .users
            .find_by_id(user_id)
            .await
            .map_err(to_graphql_error)?;

        let comment = Comment::new(input.content, article_id, user_id);
        let created = context
            .repos
            .comments
            .create(&comment)
            .await
            .map_err(to_graphql_error)?;
        Ok(created.into())
    }

    /// Soft-delete a comment
    async fn delete_comment(&self, ctx: &Context<'_>, id: ID) -> Result<bool> {
        let context = ctx.data::<GraphQLContext>()?;
        let id = parse_id(&id)?;
        deleted(context.repos.comments.soft_delete(id).await)
    }
}
