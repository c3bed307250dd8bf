use async_graphql::{Result, SimpleObject};
use serde::{Deserialize, Serialize, Serializer};

use crate::util::check_url;

/// What the dashboard forms send for "no files".
pub const NO_ATTACHMENTS: &str = "[]";

/// A file linked from a meet, news post or seminar.
#[derive(SimpleObject, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Where the file is stored
    pub url: String,
    /// The name shown for the file
    pub name: String,
}

impl Attachment {
    /// Validates a JSON-encoded attachment list before it is written.
    ///
    /// Empty lists (including the `"[]"` sentinel and blank strings) are stored as `NULL`.
    pub fn normalize(raw: Option<&str>) -> Result<Option<String>> {
        let raw = match raw.map(str::trim) {
            None | Some("") | Some(NO_ATTACHMENTS) => return Ok(None),
            Some(raw) => raw,
        };

        let attachments: Vec<Attachment> = serde_json::from_str(raw).map_err(|err| {
            format!("attachments must be a JSON list of {{url, name}} pairs: {}", err)
        })?;
        if attachments.is_empty() {
            return Ok(None);
        }

        for attachment in &attachments {
            check_url("attachment url", &attachment.url)?;
            if attachment.name.trim().is_empty() {
                return Err("attachment name must not be empty".into());
            }
        }

        Ok(Some(serde_json::to_string(&attachments)?))
    }

    /// Reads a stored attachment list. Anything unreadable counts as no attachments.
    pub fn parse_stored(stored: Option<&str>) -> Vec<Attachment> {
        stored
            .and_then(|stored| serde_json::from_str(stored).ok())
            .unwrap_or_default()
    }

    /// Writes a stored list into snapshots as a real JSON array.
    pub fn serialize_stored<S: Serializer>(
        stored: &Option<String>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        Self::parse_stored(stored.as_deref()).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sentinel_is_stored_as_null() {
        assert_eq!(Attachment::normalize(Some("[]")).unwrap(), None);
        assert_eq!(Attachment::normalize(Some(" [ ] ")).unwrap(), None);
        assert_eq!(Attachment::normalize(Some("")).unwrap(), None);
        assert_eq!(Attachment::normalize(None).unwrap(), None);
    }

    #[test]
    fn valid_lists_are_kept() {
        let raw = r#"[{"url": "https://blob.example/entries.pdf", "name": "Entries"}]"#;
        let stored = Attachment::normalize(Some(raw)).unwrap().unwrap();

        assert_eq!(
            Attachment::parse_stored(Some(&stored)),
            vec![Attachment {
                url: "https://blob.example/entries.pdf".to_owned(),
                name: "Entries".to_owned(),
            }]
        );
    }

    #[test]
    fn malformed_lists_are_rejected() {
        assert!(Attachment::normalize(Some("entries.pdf")).is_err());
        assert!(Attachment::normalize(Some(r#"[{"url": "https://blob.example/a.pdf"}]"#)).is_err());
        assert!(Attachment::normalize(Some(r#"[{"url": "a.pdf", "name": "A"}]"#)).is_err());
        assert!(Attachment::normalize(Some(r#"[{"url": "/a.pdf", "name": " "}]"#)).is_err());
    }

    #[test]
    fn unreadable_stored_value_means_no_attachments() {
        assert!(Attachment::parse_stored(Some("not json")).is_empty());
        assert!(Attachment::parse_stored(None).is_empty());
    }
}
