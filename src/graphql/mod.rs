use async_graphql::{Context, EmptySubscription, Schema};

use crate::graphql::mutation::MutationRoot;
use crate::graphql::query::QueryRoot;
use crate::models::permissions::Visibility;
use crate::models::user::User;

pub mod guards;
pub mod mutation;
pub mod query;

pub const SUCCESS_MESSAGE: &str = "success";

pub type FederationSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema() -> FederationSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}

/// What the current viewer may see. Anonymous viewers and callers that
/// didn't ask for drafts only get approved rows.
async fn visibility(ctx: &Context<'_>, include_drafts: bool) -> async_graphql::Result<Visibility> {
    match ctx.data_opt::<User>() {
        Some(user) if include_drafts => user.visibility(ctx.data_unchecked()).await,
        _ => Ok(Visibility::Public),
    }
}
