use async_graphql::{ComplexObject, Context, Result, SimpleObject};
use sqlx::PgPool;

use crate::models::permissions::Permission;
use crate::util::check_length;

/// A set of users sharing the same permissions
#[derive(SimpleObject, sqlx::FromRow, Clone, Debug)]
#[graphql(complex)]
pub struct Group {
    /// The ID of the group
    pub id: i64,
    /// The name of the group
    pub name: String,
}

#[ComplexObject]
impl Group {
    /// What the group may do, per category
    pub async fn permissions(&self, ctx: &Context<'_>) -> Result<Vec<Permission>> {
        let pool: &PgPool = ctx.data_unchecked();
        Permission::for_group(self.id, pool).await
    }
}

impl Group {
    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| "Group ID does not exist".into())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as("SELECT id, name FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as("SELECT id, name FROM groups ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    async fn name_taken(name: &str, except: Option<i64>, pool: &PgPool) -> Result<bool> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM groups WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        Ok(existing.map_or(false, |id| Some(id) != except))
    }

    pub async fn create(name: &str, pool: &PgPool) -> Result<i64> {
        check_length("name", name, 1, 128)?;
        let name = name.trim();
        if Self::name_taken(name, None, pool).await? {
            return Err(format!("A group named {} already exists", name).into());
        }

        sqlx::query_scalar("INSERT INTO groups (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn rename(id: i64, name: &str, pool: &PgPool) -> Result<()> {
        check_length("name", name, 1, 128)?;
        Self::with_id(id, pool).await?;
        let name = name.trim();
        if Self::name_taken(name, Some(id), pool).await? {
            return Err(format!("A group named {} already exists", name).into());
        }

        sqlx::query("UPDATE groups SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn delete(id: i64, pool: &PgPool) -> Result<()> {
        Self::with_id(id, pool).await?;

        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
