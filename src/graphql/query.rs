use async_graphql::{Context, Object, Result, ID};

use super::schema::GraphQLContext;
use super::types::{ArticleObject, TagObject, UserObject};
use super::{optional, parse_id, to_graphql_error};

/// Root query object for GraphQL
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// A live article by ID, or `null`
    async fn article(&self, ctx: &Context<'_>, id: ID) -> Result<Option<ArticleObject>> {
        let context = ctx.data::<GraphQLContext>()?;
        let id = parse_id(&id)?;
        let article = optional(context.repos.articles.find_by_id(id).await)?;
        Ok(article.map(ArticleObject::from))
    }

    /// Published articles, newest first
    async fn articles(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 20)] limit: i32,
    ) -> Result<Vec<ArticleObject>> {
        let context = ctx.data::<GraphQLContext>()?;
        let articles = context
            .repos
            .articles
            .list_published(i64::from(limit.max(0)))
            .await
            .map_err(to_graphql_error)?;
        Ok(articles.into_iter().map(ArticleObject::from).collect())
    }

    /// Published articles carrying a tag
    async fn articles_by_tag(&self, ctx: &Context<'_>, tag: String) -> Result<Vec<ArticleObject>> {
        let context = ctx.data::<GraphQLContext>()?;
        let articles = context
            .repos
            .articles
            .list_by_tag(&tag)
            .await
            .map_err(to_graphql_error)?;
        Ok(articles.into_iter().map(ArticleObject::from).collect())
    }

    async fn tags(&self, ctx: &Context<'_>) -> Result<Vec<TagObject>> {
        let context = ctx.data::<GraphQLContext>()?;
        let tags = context.repos.tags.list().await.map_err(to_graphql_error)?;
        Ok(tags.into_iter().map(TagObject::from).collect())
    }

    async fn user(&self, ctx: &Context<'_>, id: ID) -> Result<Option<UserObject>> {
        let context = ctx.data::<GraphQLContext>()?;
        let id = parse_id(&id)?;
        let user = optional(context.repos.users.find_by_id(id).await)?;
        Ok(user.map(UserObject::from))
    }
}
