//! Building snapshot contents from approved rows.

use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use super::{PublishError, SnapshotKey};
use crate::models::content::ApprovalState;
use crate::models::meet::Meet;
use crate::models::news::{News, TOP_NEWS_COUNT};
use crate::models::record::Record;
use crate::models::seminar::Seminar;

/// Rows that can end up in a public snapshot.
pub trait Publishable {
    fn approval(&self) -> ApprovalState;
}

macro_rules! publishable {
    ($($row:ty),*) => {
        $(impl Publishable for $row {
            fn approval(&self) -> ApprovalState {
                ApprovalState::from(self.approved)
            }
        })*
    };
}

publishable!(News, Meet, Record, Seminar);

/// Drops every row that isn't approved, keeping the order.
pub fn public_rows<T: Publishable>(rows: Vec<T>) -> Vec<T> {
    rows.into_iter()
        .filter(|row| row.approval().is_public())
        .collect()
}

/// Approved posts from a newest-first list, optionally capped.
pub fn news_rows(all: Vec<News>, limit: Option<usize>) -> Vec<News> {
    let mut rows = public_rows(all);
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    rows
}

fn loaded<T>(result: async_graphql::Result<T>) -> Result<T, PublishError> {
    result.map_err(|err| PublishError::Load(err.message))
}

fn to_json(rows: &impl Serialize) -> Result<Value, PublishError> {
    serde_json::to_value(rows).map_err(Into::into)
}

pub async fn build(key: &SnapshotKey, pool: &PgPool) -> Result<Value, PublishError> {
    match *key {
        SnapshotKey::NewsTop => {
            let all = loaded(News::all(pool).await)?;
            to_json(&news_rows(all, Some(TOP_NEWS_COUNT)))
        }
        SnapshotKey::NewsAll => to_json(&news_rows(loaded(News::all(pool).await)?, None)),
        SnapshotKey::Meets { year, kind } => {
            let meets = loaded(Meet::matching(Some(year), Some(kind), pool).await)?;
            to_json(&public_rows(meets))
        }
        SnapshotKey::Records {
            age_category,
            pool: pool_length,
        } => {
            let records =
                loaded(Record::matching(Some(age_category), Some(pool_length), pool).await)?;
            to_json(&Record::fastest(public_rows(records)))
        }
        SnapshotKey::Seminars => to_json(&public_rows(loaded(Seminar::all(pool).await)?)),
    }
}

/// Every key that should exist given the current database contents.
pub async fn all_keys(pool: &PgPool) -> Result<Vec<SnapshotKey>, PublishError> {
    let mut keys = vec![
        SnapshotKey::NewsTop,
        SnapshotKey::NewsAll,
        SnapshotKey::Seminars,
    ];

    let seasons = loaded(Meet::seasons(pool).await)?;
    keys.extend(
        seasons
            .into_iter()
            .map(|(year, kind)| SnapshotKey::Meets { year, kind }),
    );
    keys.extend(SnapshotKey::record_keys());

    Ok(keys)
}
