use std::fmt;

use async_graphql::{InputValueError, InputValueResult, Scalar, ScalarType, Value};
use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub mod attachment;
pub mod category;
pub mod content;
pub mod group;
pub mod live;
pub mod meet;
pub mod news;
pub mod permissions;
pub mod record;
pub mod seminar;
pub mod sponsorship;
pub mod user;

pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A calendar date, written as `YYYY-MM-DD`.
#[derive(sqlx::Type, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(transparent)]
pub struct DateScalar(pub Date);

impl DateScalar {
    pub fn parse_str(date_str: &str) -> Option<Self> {
        Date::parse(date_str, DATE_FORMAT).ok().map(DateScalar)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }
}

impl fmt::Display for DateScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(DATE_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&formatted)
    }
}

#[Scalar]
impl ScalarType for DateScalar {
    fn parse(value: Value) -> InputValueResult<Self> {
        if let Value::String(date_str) = &value {
            if let Some(date) = DateScalar::parse_str(date_str) {
                return Ok(date);
            }
        }

        Err(InputValueError::expected_type(value))
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl Serialize for DateScalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An RFC 3339 timestamp.
#[derive(sqlx::Type, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(transparent)]
pub struct DateTime(pub OffsetDateTime);

impl From<OffsetDateTime> for DateTime {
    fn from(time: OffsetDateTime) -> Self {
        DateTime(time)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        f.write_str(&formatted)
    }
}

#[Scalar]
impl ScalarType for DateTime {
    fn parse(value: Value) -> InputValueResult<Self> {
        if let Value::String(time_str) = &value {
            if let Ok(time) = OffsetDateTime::parse(time_str, &Rfc3339) {
                return Ok(DateTime(time));
            }
        }

        Err(InputValueError::expected_type(value))
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn dates_use_iso_format() {
        let date = DateScalar(date!(2026 - 03 - 07));
        assert_eq!(date.to_string(), "2026-03-07");
        assert_eq!(DateScalar::parse_str("2026-03-07"), Some(date));
        assert_eq!(DateScalar::parse_str("07.03.2026"), None);
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let time = DateTime(datetime!(2026-03-07 18:30 UTC));
        assert_eq!(
            serde_json::to_string(&time).unwrap(),
            "\"2026-03-07T18:30:00Z\""
        );
    }
}
