//! Plumbing shared by every table that goes through the approval workflow.

use async_graphql::Result;
use sqlx::PgPool;

use crate::models::user::User;
use crate::util::current_time;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    News,
    Meet,
    Record,
    Seminar,
    Live,
}

impl ContentKind {
    pub fn table(self) -> &'static str {
        match self {
            ContentKind::News => "news",
            ContentKind::Meet => "meets",
            ContentKind::Record => "records",
            ContentKind::Seminar => "seminars",
            ContentKind::Live => "lives",
        }
    }

    pub fn entity(self) -> &'static str {
        match self {
            ContentKind::News => "News",
            ContentKind::Meet => "Meet",
            ContentKind::Record => "Record",
            ContentKind::Seminar => "Seminar",
            ContentKind::Live => "Live",
        }
    }

    pub fn missing(self) -> async_graphql::Error {
        format!("{} ID does not exist", self.entity()).into()
    }

    /// Loads what the workflow needs to know about a row, failing if it doesn't exist.
    pub async fn header(self, id: i64, pool: &PgPool) -> Result<ContentHeader> {
        sqlx::query_as(&format!(
            "SELECT id, category_id, approved FROM {} WHERE id = $1",
            self.table()
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| self.missing())
    }

    pub async fn approve(self, header: &ContentHeader, user: &User, pool: &PgPool) -> Result<()> {
        header.state().approve(self)?;

        sqlx::query(&format!(
            "UPDATE {} SET approved = TRUE, approved_user_id = $1, approved_at = $2
             WHERE id = $3",
            self.table()
        ))
        .bind(user.id)
        .bind(current_time())
        .bind(header.id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete(self, header: &ContentHeader, pool: &PgPool) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table()))
            .bind(header.id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHeader {
    pub id: i64,
    pub category_id: i64,
    pub approved: bool,
}

impl ContentHeader {
    pub fn state(&self) -> ApprovalState {
        ApprovalState::from(self.approved)
    }
}

/// Where a row is in the publication workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalState {
    /// Freshly created or edited, only visible in the dashboard
    Draft,
    /// Visible on the public pages
    Approved,
}

impl From<bool> for ApprovalState {
    fn from(approved: bool) -> Self {
        if approved {
            ApprovalState::Approved
        } else {
            ApprovalState::Draft
        }
    }
}

impl ApprovalState {
    /// Any edit sends a row back for approval.
    pub fn revise(self) -> Self {
        ApprovalState::Draft
    }

    pub fn approve(self, kind: ContentKind) -> Result<Self> {
        match self {
            ApprovalState::Draft => Ok(ApprovalState::Approved),
            ApprovalState::Approved => Err(format!("{} is already approved", kind.entity()).into()),
        }
    }

    pub fn is_public(self) -> bool {
        self == ApprovalState::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_always_land_in_draft() {
        assert_eq!(ApprovalState::Approved.revise(), ApprovalState::Draft);
        assert_eq!(ApprovalState::Draft.revise(), ApprovalState::Draft);
    }

    #[test]
    fn revising_an_approved_row_unpublishes_it() {
        let header = ContentHeader {
            id: 4,
            category_id: 2,
            approved: true,
        };

        assert!(!header.state().revise().is_public());
        assert_eq!(
            header.state().approve(ContentKind::News).unwrap_err().message,
            "News is already approved"
        );
    }

    #[test]
    fn approval_only_from_draft() {
        assert_eq!(
            ApprovalState::Draft.approve(ContentKind::Meet).unwrap(),
            ApprovalState::Approved
        );

        let error = ApprovalState::Approved
            .approve(ContentKind::Meet)
            .unwrap_err();
        assert_eq!(error.message, "Meet is already approved");
    }

    #[test]
    fn only_approved_rows_are_public() {
        assert!(ApprovalState::from(true).is_public());
        assert!(!ApprovalState::from(false).is_public());
    }

    #[test]
    fn missing_rows_name_the_entity() {
        assert_eq!(ContentKind::News.missing().message, "News ID does not exist");
        assert_eq!(ContentKind::Record.table(), "records");
    }
}
