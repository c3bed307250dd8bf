use async_graphql::{InputObject, Result, SimpleObject};
use sqlx::PgPool;

use crate::util::{check_length, non_blank};

/// A section of the federation's content that permissions are granted on
#[derive(SimpleObject, sqlx::FromRow, Clone, Debug)]
pub struct Category {
    /// The ID of the category
    pub id: i64,
    /// The name of the category
    pub name: String,
    /// What belongs in the category
    pub description: Option<String>,
}

#[derive(InputObject)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn validate(&self) -> Result<()> {
        check_length("name", &self.name, 1, 128)
    }
}

impl Category {
    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| "Category ID does not exist".into())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as("SELECT id, name, description FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn with_name_opt(name: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as("SELECT id, name, description FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as("SELECT id, name, description FROM categories ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(new_category: NewCategory, pool: &PgPool) -> Result<i64> {
        new_category.validate()?;
        let name = new_category.name.trim();
        if Self::with_name_opt(name, pool).await?.is_some() {
            return Err(format!("A category named {} already exists", name).into());
        }

        sqlx::query_scalar("INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(non_blank(new_category.description))
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn update(id: i64, update: NewCategory, pool: &PgPool) -> Result<()> {
        update.validate()?;
        Self::with_id(id, pool).await?;
        let name = update.name.trim();
        if let Some(existing) = Self::with_name_opt(name, pool).await? {
            if existing.id != id {
                return Err(format!("A category named {} already exists", name).into());
            }
        }

        sqlx::query("UPDATE categories SET name = $1, description = $2 WHERE id = $3")
            .bind(name)
            .bind(non_blank(update.description))
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn delete(id: i64, pool: &PgPool) -> Result<()> {
        Self::with_id(id, pool).await?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|err| format!("Could not delete category {}: {}", id, err))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_owned(),
            description: None,
        }
    }

    #[test]
    fn name_length_boundaries() {
        assert!(named("").validate().is_err());
        assert!(named("A").validate().is_ok());
        assert!(named(&"A".repeat(128)).validate().is_ok());
        assert!(named(&"A".repeat(129)).validate().is_err());
    }
}
