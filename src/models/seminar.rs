use async_graphql::{ComplexObject, InputObject, Result, SimpleObject};
use serde::Serialize;
use sqlx::PgPool;

use crate::models::attachment::Attachment;
use crate::models::content::{ContentHeader, ContentKind};
use crate::models::user::User;
use crate::models::{DateScalar, DateTime};
use crate::publish::SnapshotKey;
use crate::util::{check_length, current_time};

const COLUMNS: &str = "id, category_id, title, date, location, description, attachments,
    created_user_id, revised_user_id, approved_user_id, approved,
    created_at, revised_at, approved_at";

/// A coaching or officiating seminar
#[derive(SimpleObject, sqlx::FromRow, Serialize, Clone, Debug)]
#[graphql(complex)]
pub struct Seminar {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub date: DateScalar,
    pub location: String,
    pub description: String,
    pub created_user_id: i64,
    pub revised_user_id: Option<i64>,
    pub approved_user_id: Option<i64>,
    pub approved: bool,
    pub created_at: DateTime,
    pub revised_at: Option<DateTime>,
    pub approved_at: Option<DateTime>,

    #[graphql(skip)]
    #[serde(serialize_with = "Attachment::serialize_stored")]
    pub attachments: Option<String>,
}

#[ComplexObject]
impl Seminar {
    /// Slides, handouts and registration forms
    pub async fn attachments(&self) -> Vec<Attachment> {
        Attachment::parse_stored(self.attachments.as_deref())
    }
}

#[derive(InputObject)]
pub struct NewSeminar {
    pub category_id: i64,
    pub title: String,
    pub date: DateScalar,
    pub location: String,
    pub description: String,
    /// A JSON list of `{url, name}` pairs
    pub attachments: Option<String>,
}

impl NewSeminar {
    pub fn validate(&self) -> Result<()> {
        check_length("title", &self.title, 1, 256)?;
        check_length("location", &self.location, 1, 256)?;
        check_length("description", &self.description, 1, 100_000)
    }
}

impl Seminar {
    pub const KIND: ContentKind = ContentKind::Seminar;

    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| Self::KIND.missing())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as(&format!("SELECT {} FROM seminars WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as(&format!("SELECT {} FROM seminars ORDER BY date DESC", COLUMNS))
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(new_seminar: NewSeminar, user: &User, pool: &PgPool) -> Result<i64> {
        new_seminar.validate()?;
        let attachments = Attachment::normalize(new_seminar.attachments.as_deref())?;

        sqlx::query_scalar(
            "INSERT INTO seminars
                 (category_id, title, date, location, description, attachments,
                  created_user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(new_seminar.category_id)
        .bind(new_seminar.title.trim())
        .bind(new_seminar.date)
        .bind(new_seminar.location.trim())
        .bind(&new_seminar.description)
        .bind(attachments)
        .bind(user.id)
        .bind(current_time())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Rewrites a row the caller has already loaded, sending it back to draft.
    pub async fn update(
        header: &ContentHeader,
        update: NewSeminar,
        user: &User,
        pool: &PgPool,
    ) -> Result<()> {
        update.validate()?;
        let attachments = Attachment::normalize(update.attachments.as_deref())?;

        let result = sqlx::query(
            "UPDATE seminars SET category_id = $1, title = $2, date = $3, location = $4,
                 description = $5, attachments = $6, approved = $10, revised_user_id = $7,
                 revised_at = $8
             WHERE id = $9",
        )
        .bind(update.category_id)
        .bind(update.title.trim())
        .bind(update.date)
        .bind(update.location.trim())
        .bind(&update.description)
        .bind(attachments)
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

    pub fn snapshot_keys() -> Vec<SnapshotKey> {
        vec![SnapshotKey::Seminars]
    }
}
