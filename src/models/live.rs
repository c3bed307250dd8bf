use async_graphql::{InputObject, Result, SimpleObject};
use sqlx::PgPool;

use crate::models::content::{ContentHeader, ContentKind};
use crate::models::user::User;
use crate::models::DateTime;
use crate::util::{check_length, check_url, current_time};

const COLUMNS: &str = "id, category_id, title, url, starts_at,
    created_user_id, revised_user_id, approved_user_id, approved,
    created_at, revised_at, approved_at";

/// A live stream announcement
#[derive(SimpleObject, sqlx::FromRow, Clone, Debug)]
pub struct Live {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    /// Where the stream can be watched
    pub url: String,
    pub starts_at: DateTime,
    pub created_user_id: i64,
    pub revised_user_id: Option<i64>,
    pub approved_user_id: Option<i64>,
    pub approved: bool,
    pub created_at: DateTime,
    pub revised_at: Option<DateTime>,
    pub approved_at: Option<DateTime>,
}

#[derive(InputObject)]
pub struct NewLive {
    pub category_id: i64,
    pub title: String,
    pub url: String,
    pub starts_at: DateTime,
}

impl NewLive {
    pub fn validate(&self) -> Result<()> {
        check_length("title", &self.title, 1, 256)?;
        check_url("url", &self.url)
    }
}

impl Live {
    pub const KIND: ContentKind = ContentKind::Live;

    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| Self::KIND.missing())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as(&format!("SELECT {} FROM lives WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as(&format!("SELECT {} FROM lives ORDER BY starts_at DESC", COLUMNS))
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(new_live: NewLive, user: &User, pool: &PgPool) -> Result<i64> {
        new_live.validate()?;

        sqlx::query_scalar(
            "INSERT INTO lives (category_id, title, url, starts_at, created_user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(new_live.category_id)
        .bind(new_live.title.trim())
        .bind(new_live.url.trim())
        .bind(new_live.starts_at)
        .bind(user.id)
        .bind(current_time())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Rewrites a row the caller has already loaded, sending it back to draft.
    pub async fn update(
        header: &ContentHeader,
        update: NewLive,
        user: &User,
        pool: &PgPool,
    ) -> Result<()> {
        update.validate()?;

        let result = sqlx::query(
            "UPDATE lives SET category_id = $1, title = $2, url = $3, starts_at = $4,
                 approved = $8, revised_user_id = $5, revised_at = $6
             WHERE id = $7",
        )
        .bind(update.category_id)
        .bind(update.title.trim())
        .bind(update.url.trim())
        .bind(update.starts_at)
        .bind(user.id)
        .bind(current_time())
        .bind(header.id)
        .bind(header.state().revise().is_public())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::KIND.missing());
        }

        Ok(())
    }
}
