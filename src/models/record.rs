use std::collections::BTreeMap;
use std::fmt;

use async_graphql::{
    ComplexObject, Enum, InputObject, InputValueError, InputValueResult, Result, Scalar,
    ScalarType, SimpleObject, Value,
};
use regex::Regex;
use serde::Serialize;
use sqlx::PgPool;

use crate::models::content::{ContentHeader, ContentKind};
use crate::models::meet::PoolLength;
use crate::models::user::User;
use crate::models::{DateScalar, DateTime};
use crate::publish::SnapshotKey;
use crate::util::{check_length, current_time};

const COLUMNS: &str = "id, category_id, age_category, pool, sex, style, distance, relay,
    time_cs, swimmers, team, meet_name, set_on,
    created_user_id, revised_user_id, approved_user_id, approved,
    created_at, revised_at, approved_at";

pub const INDIVIDUAL_DISTANCES: [i32; 6] = [50, 100, 200, 400, 800, 1500];
pub const RELAY_LEG_DISTANCES: [i32; 3] = [50, 100, 200];
pub const RELAY_SWIMMERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enum, sqlx::Type, Serialize)]
#[sqlx(type_name = "age_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgeCategory {
    Open,
    Junior,
    Youth,
    Masters,
}

impl AgeCategory {
    pub const ALL: [AgeCategory; 4] = [
        AgeCategory::Open,
        AgeCategory::Junior,
        AgeCategory::Youth,
        AgeCategory::Masters,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgeCategory::Open => "open",
            AgeCategory::Junior => "junior",
            AgeCategory::Youth => "youth",
            AgeCategory::Masters => "masters",
        }
    }
}

impl fmt::Display for AgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enum, sqlx::Type, Serialize)]
#[sqlx(type_name = "sex", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enum, sqlx::Type, Serialize)]
#[sqlx(type_name = "stroke", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stroke {
    Freestyle,
    Backstroke,
    Breaststroke,
    Butterfly,
    Medley,
}

/// A swim time in centiseconds, written as `m:ss.cc` or `ss.cc`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordTime(pub i32);

impl RecordTime {
    pub fn parse_str(time: &str) -> Option<Self> {
        let regex = Regex::new(r"^(?:(\d{1,2}):([0-5]\d)|(\d{1,2}))\.(\d{2})$").unwrap();
        let captures = regex.captures(time.trim())?;
        let number = |index: usize| {
            captures
                .get(index)
                .and_then(|found| found.as_str().parse::<i32>().ok())
        };

        let (minutes, seconds) = match number(1) {
            Some(minutes) => (minutes, number(2)?),
            None => (0, number(3)?),
        };
        let centiseconds = (minutes * 60 + seconds) * 100 + number(4)?;

        (centiseconds > 0).then(|| RecordTime(centiseconds))
    }
}

impl fmt::Display for RecordTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hundredths = self.0 % 100;
        let total_seconds = self.0 / 100;
        let (minutes, seconds) = (total_seconds / 60, total_seconds % 60);

        if minutes > 0 {
            write!(f, "{}:{:02}.{:02}", minutes, seconds, hundredths)
        } else {
            write!(f, "{}.{:02}", seconds, hundredths)
        }
    }
}

#[Scalar]
impl ScalarType for RecordTime {
    fn parse(value: Value) -> InputValueResult<Self> {
        match &value {
            Value::String(time) => RecordTime::parse_str(time).ok_or_else(|| {
                InputValueError::custom("Times must look like 1:02.35 or 58.21")
            }),
            Value::Number(number) => number
                .as_i64()
                .filter(|centiseconds| *centiseconds > 0 && *centiseconds <= i32::MAX as i64)
                .map(|centiseconds| RecordTime(centiseconds as i32))
                .ok_or_else(|| InputValueError::custom("Times in centiseconds must be positive")),
            _ => Err(InputValueError::expected_type(value)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

/// A federation record
#[derive(SimpleObject, sqlx::FromRow, Serialize, Clone, Debug)]
#[graphql(complex)]
pub struct Record {
    /// The ID of the record
    pub id: i64,
    pub category_id: i64,
    pub age_category: AgeCategory,
    pub pool: PoolLength,
    pub sex: Sex,
    pub style: Stroke,
    /// Metres, per swimmer for relays
    pub distance: i32,
    pub relay: bool,
    /// The record time in centiseconds
    pub time_cs: i32,
    /// The record holder, or the relay team members
    pub swimmers: String,
    /// The club the record was swum for
    pub team: String,
    /// The meet the record was set at
    pub meet_name: String,
    /// When the record was set
    pub set_on: DateScalar,
    pub created_user_id: i64,
    pub revised_user_id: Option<i64>,
    pub approved_user_id: Option<i64>,
    pub approved: bool,
    pub created_at: DateTime,
    pub revised_at: Option<DateTime>,
    pub approved_at: Option<DateTime>,
}

#[ComplexObject]
impl Record {
    /// The record time, formatted
    pub async fn time(&self) -> RecordTime {
        RecordTime(self.time_cs)
    }
}

#[derive(InputObject)]
pub struct NewRecord {
    pub category_id: i64,
    pub age_category: AgeCategory,
    pub pool: PoolLength,
    pub sex: Sex,
    pub style: Stroke,
    pub distance: i32,
    #[graphql(default)]
    pub relay: bool,
    pub time: RecordTime,
    pub swimmers: Vec<String>,
    pub team: String,
    pub meet_name: String,
    pub set_on: DateScalar,
}

impl NewRecord {
    pub fn validate(&self) -> Result<()> {
        if self.relay {
            if !RELAY_LEG_DISTANCES.contains(&self.distance) {
                return Err(format!("{}m is not a relay leg distance", self.distance).into());
            }
            if self.swimmers.len() != RELAY_SWIMMERS {
                return Err(format!("relays need exactly {} swimmers", RELAY_SWIMMERS).into());
            }
        } else {
            if !INDIVIDUAL_DISTANCES.contains(&self.distance) {
                return Err(format!("{}m is not a record distance", self.distance).into());
            }
            if self.swimmers.len() != 1 {
                return Err("individual records need exactly one swimmer".into());
            }
            if self.style == Stroke::Medley && ![100, 200, 400].contains(&self.distance) {
                return Err(format!("{}m is not an individual medley distance", self.distance).into());
            }
        }

        for swimmer in &self.swimmers {
            check_length("swimmer", swimmer, 1, 128)?;
        }
        check_length("team", &self.team, 1, 128)?;
        check_length("meet name", &self.meet_name, 1, 256)?;

        Ok(())
    }

    fn swimmer_names(&self) -> String {
        self.swimmers
            .iter()
            .map(|swimmer| swimmer.trim())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Record {
    pub const KIND: ContentKind = ContentKind::Record;

    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| Self::KIND.missing())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as(&format!("SELECT {} FROM records WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn matching(
        age_category: Option<AgeCategory>,
        pool_length: Option<PoolLength>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM records
             WHERE ($1::age_category IS NULL OR age_category = $1)
               AND ($2::pool_length IS NULL OR pool = $2)
             ORDER BY sex, style, relay, distance, time_cs",
            COLUMNS
        ))
        .bind(age_category)
        .bind(pool_length)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create(new_record: NewRecord, user: &User, pool: &PgPool) -> Result<i64> {
        new_record.validate()?;

        sqlx::query_scalar(
            "INSERT INTO records
                 (category_id, age_category, pool, sex, style, distance, relay, time_cs,
                  swimmers, team, meet_name, set_on, created_user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING id",
        )
        .bind(new_record.category_id)
        .bind(new_record.age_category)
        .bind(new_record.pool)
        .bind(new_record.sex)
        .bind(new_record.style)
        .bind(new_record.distance)
        .bind(new_record.relay)
        .bind(new_record.time.0)
        .bind(new_record.swimmer_names())
        .bind(new_record.team.trim())
        .bind(new_record.meet_name.trim())
        .bind(new_record.set_on)
        .bind(user.id)
        .bind(current_time())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Rewrites a row the caller has already loaded, sending it back to draft.
    pub async fn update(
        header: &ContentHeader,
        update: NewRecord,
        user: &User,
        pool: &PgPool,
    ) -> Result<()> {
        update.validate()?;

        let result = sqlx::query(
            "UPDATE records SET category_id = $1, age_category = $2, pool = $3, sex = $4,
                 style = $5, distance = $6, relay = $7, time_cs = $8, swimmers = $9, team = $10,
                 meet_name = $11, set_on = $12, approved = $16, revised_user_id = $13,
                 revised_at = $14
             WHERE id = $15",
        )
        .bind(update.category_id)
        .bind(update.age_category)
        .bind(update.pool)
        .bind(update.sex)
        .bind(update.style)
        .bind(update.distance)
        .bind(update.relay)
        .bind(update.time.0)
        .bind(update.swimmer_names())
        .bind(update.team.trim())
        .bind(update.meet_name.trim())
        .bind(update.set_on)
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

    /// Keeps the fastest time per event, oldest first on ties.
    pub fn fastest(records: Vec<Record>) -> Vec<Record> {
        let mut best: BTreeMap<(Sex, Stroke, bool, i32), Record> = BTreeMap::new();

        for record in records {
            let event = (record.sex, record.style, record.relay, record.distance);
            let faster = best.get(&event).map_or(true, |current| {
                (record.time_cs, record.set_on) < (current.time_cs, current.set_on)
            });
            if faster {
                best.insert(event, record);
            }
        }

        best.into_values().collect()
    }

    pub fn snapshot_keys(before: Option<&Record>, after: Option<&Record>) -> Vec<SnapshotKey> {
        let mut keys: Vec<SnapshotKey> = before
            .into_iter()
            .chain(after)
            .map(|record| SnapshotKey::Records {
                age_category: record.age_category,
                pool: record.pool,
            })
            .collect();
        keys.dedup();

        keys
    }
}
