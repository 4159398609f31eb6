use async_graphql::{EmptySubscription, Schema};

use super::mutation::MutationRoot;
use super::query::QueryRoot;
use crate::db::repositories::Repositories;

/// GraphQL context containing shared application state
pub struct GraphQLContext {
    pub repos: Repositories,
}

/// The complete GraphQL schema
pub type BlogSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Create the GraphQL schema over the given repositories
pub fn build_schema(repos: Repositories) -> BlogSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(GraphQLContext { repos })
        .finish()
}
