use std::fmt;

use async_graphql::{ComplexObject, Enum, InputObject, Result, SimpleObject};
use serde::Serialize;
use sqlx::PgPool;

use crate::models::attachment::Attachment;
use crate::models::content::{ContentHeader, ContentKind};
use crate::models::user::User;
use crate::models::{DateScalar, DateTime};
use crate::publish::SnapshotKey;
use crate::util::{check_length, current_time, non_blank};

const COLUMNS: &str = "id, category_id, title, kind, start_date, end_date, venue, pool,
    announcement, attachments, results,
    created_user_id, revised_user_id, approved_user_id, approved,
    created_at, revised_at, approved_at";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enum, sqlx::Type, Serialize)]
#[sqlx(type_name = "meet_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MeetKind {
    Domestic,
    International,
}

impl MeetKind {
    pub const ALL: [MeetKind; 2] = [MeetKind::Domestic, MeetKind::International];

    pub fn as_str(self) -> &'static str {
        match self {
            MeetKind::Domestic => "domestic",
            MeetKind::International => "international",
        }
    }
}

impl fmt::Display for MeetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short course (25m) or long course (50m)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enum, sqlx::Type, Serialize)]
#[sqlx(type_name = "pool_length", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PoolLength {
    Scm,
    Lcm,
}

impl PoolLength {
    pub const ALL: [PoolLength; 2] = [PoolLength::Scm, PoolLength::Lcm];

    pub fn as_str(self) -> &'static str {
        match self {
            PoolLength::Scm => "scm",
            PoolLength::Lcm => "lcm",
        }
    }
}

impl fmt::Display for PoolLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A competition announcement
#[derive(SimpleObject, sqlx::FromRow, Serialize, Clone, Debug)]
#[graphql(complex)]
pub struct Meet {
    /// The ID of the meet
    pub id: i64,
    pub category_id: i64,
    /// The name of the meet
    pub title: String,
    pub kind: MeetKind,
    /// The first day of competition
    pub start_date: DateScalar,
    /// The last day of competition
    pub end_date: DateScalar,
    /// Where the meet is held
    pub venue: String,
    pub pool: PoolLength,
    /// Free-form details for competitors
    pub announcement: Option<String>,
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
    #[graphql(skip)]
    #[serde(serialize_with = "Attachment::serialize_stored")]
    pub results: Option<String>,
}

#[ComplexObject]
impl Meet {
    /// Entry lists, schedules and other documents
    pub async fn attachments(&self) -> Vec<Attachment> {
        Attachment::parse_stored(self.attachments.as_deref())
    }

    /// Result sheets, once the meet is over
    pub async fn results(&self) -> Vec<Attachment> {
        Attachment::parse_stored(self.results.as_deref())
    }
}

#[derive(InputObject)]
pub struct NewMeet {
    pub category_id: i64,
    pub title: String,
    pub kind: MeetKind,
    pub start_date: DateScalar,
    pub end_date: DateScalar,
    pub venue: String,
    pub pool: PoolLength,
    pub announcement: Option<String>,
    /// A JSON list of `{url, name}` pairs
    pub attachments: Option<String>,
    /// A JSON list of `{url, name}` pairs
    pub results: Option<String>,
}

impl NewMeet {
    pub fn validate(&self) -> Result<()> {
        check_length("title", &self.title, 1, 256)?;
        check_length("venue", &self.venue, 1, 256)?;
        if self.end_date < self.start_date {
            return Err("end date must not be before start date".into());
        }

        Ok(())
    }
}

impl Meet {
    pub const KIND: ContentKind = ContentKind::Meet;

    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| Self::KIND.missing())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as(&format!("SELECT {} FROM meets WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn matching(
        year: Option<i32>,
        kind: Option<MeetKind>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM meets
             WHERE ($1::INT IS NULL OR EXTRACT(YEAR FROM start_date)::INT = $1)
               AND ($2::meet_kind IS NULL OR kind = $2)
             ORDER BY start_date",
            COLUMNS
        ))
        .bind(year)
        .bind(kind)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Every (year, kind) pair that has at least one meet.
    pub async fn seasons(pool: &PgPool) -> Result<Vec<(i32, MeetKind)>> {
        sqlx::query_as(
            "SELECT DISTINCT EXTRACT(YEAR FROM start_date)::INT AS year, kind FROM meets
             ORDER BY year, kind",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create(new_meet: NewMeet, user: &User, pool: &PgPool) -> Result<i64> {
        new_meet.validate()?;
        let attachments = Attachment::normalize(new_meet.attachments.as_deref())?;
        let results = Attachment::normalize(new_meet.results.as_deref())?;

        sqlx::query_scalar(
            "INSERT INTO meets
                 (category_id, title, kind, start_date, end_date, venue, pool,
                  announcement, attachments, results, created_user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING id",
        )
        .bind(new_meet.category_id)
        .bind(new_meet.title.trim())
        .bind(new_meet.kind)
        .bind(new_meet.start_date)
        .bind(new_meet.end_date)
        .bind(new_meet.venue.trim())
        .bind(new_meet.pool)
        .bind(non_blank(new_meet.announcement))
        .bind(attachments)
        .bind(results)
        .bind(user.id)
        .bind(current_time())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Rewrites a row the caller has already loaded, sending it back to draft.
    pub async fn update(
        header: &ContentHeader,
        update: NewMeet,
        user: &User,
        pool: &PgPool,
    ) -> Result<()> {
        update.validate()?;
        let attachments = Attachment::normalize(update.attachments.as_deref())?;
        let results = Attachment::normalize(update.results.as_deref())?;

        let result = sqlx::query(
            "UPDATE meets SET category_id = $1, title = $2, kind = $3, start_date = $4,
                 end_date = $5, venue = $6, pool = $7, announcement = $8, attachments = $9,
                 results = $10, approved = $14, revised_user_id = $11, revised_at = $12
             WHERE id = $13",
        )
        .bind(update.category_id)
        .bind(update.title.trim())
        .bind(update.kind)
        .bind(update.start_date)
        .bind(update.end_date)
        .bind(update.venue.trim())
        .bind(update.pool)
        .bind(non_blank(update.announcement))
        .bind(attachments)
        .bind(results)
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

    pub fn season(&self) -> (i32, MeetKind) {
        (self.start_date.year(), self.kind)
    }

    /// The season snapshots touched by a mutation, given the meet before and after it.
    pub fn snapshot_keys(before: Option<&Meet>, after: Option<&Meet>) -> Vec<SnapshotKey> {
        let mut keys: Vec<SnapshotKey> = before
            .into_iter()
            .chain(after)
            .map(|meet| {
                let (year, kind) = meet.season();
                SnapshotKey::Meets { year, kind }
            })
            .collect();
        keys.dedup();

        keys
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use time::macros::{date, datetime};

    use super::*;

    pub fn mock_meet() -> Meet {
        Meet {
            id: 1,
            category_id: 1,
            title: String::from("National Winter Championships"),
            kind: MeetKind::Domestic,
            start_date: DateScalar(date!(2026 - 12 - 11)),
            end_date: DateScalar(date!(2026 - 12 - 13)),
            venue: String::from("City Aquatics Centre"),
            pool: PoolLength::Scm,
            announcement: None,
            attachments: None,
            results: None,
            created_user_id: 1,
            revised_user_id: None,
            approved_user_id: None,
            approved: false,
            created_at: DateTime(datetime!(2026-10-01 12:00 UTC)),
            revised_at: None,
            approved_at: None,
        }
    }

    #[test]
    fn end_date_cannot_precede_start() {
        let meet = NewMeet {
            category_id: 1,
            title: "Spring Open".to_owned(),
            kind: MeetKind::Domestic,
            start_date: DateScalar(date!(2026 - 04 - 12)),
            end_date: DateScalar(date!(2026 - 04 - 11)),
            venue: "Harbour Pool".to_owned(),
            pool: PoolLength::Lcm,
            announcement: None,
            attachments: None,
            results: None,
        };
        assert!(meet.validate().is_err());

        let single_day = NewMeet {
            end_date: DateScalar(date!(2026 - 04 - 12)),
            ..meet
        };
        assert!(single_day.validate().is_ok());
    }

    #[test]
    fn moving_a_meet_refreshes_both_seasons() {
        let before = mock_meet();
        let after = Meet {
            start_date: DateScalar(date!(2027 - 01 - 08)),
            end_date: DateScalar(date!(2027 - 01 - 10)),
            kind: MeetKind::International,
            ..mock_meet()
        };

        let keys: Vec<String> = Meet::snapshot_keys(Some(&before), Some(&after))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(keys, vec!["meet_2026_domestic", "meet_2027_international"]);
    }

    #[test]
    fn unchanged_season_is_published_once() {
        let meet = mock_meet();
        assert_eq!(
            Meet::snapshot_keys(Some(&meet), Some(&meet)),
            vec![SnapshotKey::Meets {
                year: 2026,
                kind: MeetKind::Domestic
            }]
        );
    }

    #[test]
    fn deleting_a_meet_refreshes_its_old_season() {
        let meet = mock_meet();
        assert_eq!(Meet::snapshot_keys(Some(&meet), None).len(), 1);
    }
}
