//! Extra utilties for use elsewhere in the API.

use async_graphql::Result;
use regex::Regex;
use time::OffsetDateTime;

pub fn current_time() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Ensures a text field has between `min` and `max` characters (inclusive).
pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let length = value.trim().chars().count();
    if length < min || length > max {
        Err(format!("{} must be between {} and {} characters", field, min, max).into())
    } else {
        Ok(())
    }
}

pub fn check_url(field: &str, value: &str) -> Result<()> {
    let regex = Regex::new(r"^(https?://[^\s/$.?#][^\s]*|/[^\s]*)$").unwrap();
    if regex.is_match(value.trim()) {
        Ok(())
    } else {
        Err(format!("{} must be a valid link", field).into())
    }
}

/// Blank optional inputs are stored as `NULL`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(check_length("name", "a", 1, 128).is_ok());
        assert!(check_length("name", &"a".repeat(128), 1, 128).is_ok());
        assert!(check_length("name", "", 1, 128).is_err());
        assert!(check_length("name", "   ", 1, 128).is_err());
        assert!(check_length("name", &"a".repeat(129), 1, 128).is_err());
    }

    #[test]
    fn length_error_names_the_field() {
        let error = check_length("name", "", 1, 128).unwrap_err();
        assert_eq!(error.message, "name must be between 1 and 128 characters");
    }

    #[test]
    fn links_must_be_absolute_or_rooted() {
        assert!(check_url("link", "https://swimming.example/news/1").is_ok());
        assert!(check_url("link", "/blob/uploads/photo.jpg").is_ok());
        assert!(check_url("link", "swimming.example").is_err());
        assert!(check_url("link", "https://exa mple.com").is_err());
    }

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_blank(Some("  ".to_owned())), None);
        assert_eq!(non_blank(Some("x".to_owned())), Some("x".to_owned()));
        assert_eq!(non_blank(None), None);
    }
}
