use async_graphql::{Context, Guard, Result};

use crate::models::user::User;

pub const NOT_AUTHENTICATED: &str = "Not authenticated";

pub struct LoggedIn;

#[async_trait::async_trait]
impl Guard for LoggedIn {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        if ctx.data_opt::<User>().is_some() {
            Ok(())
        } else {
            Err(NOT_AUTHENTICATED.into())
        }
    }
}

/// Only admins may manage categories, groups, users and sponsorships.
pub struct Admin;

#[async_trait::async_trait]
impl Guard for Admin {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        match ctx.data_opt::<User>() {
            Some(user) if user.admin => Ok(()),
            Some(_) => Err("Admin access required".into()),
            None => Err(NOT_AUTHENTICATED.into()),
        }
    }
}
