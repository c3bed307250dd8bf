use std::collections::HashSet;
use std::fmt;

use async_graphql::{Enum, InputObject, Result, SimpleObject};
use sqlx::PgPool;

use crate::models::category::Category;
use crate::models::group::Group;

/// Something a group can be allowed to do within a category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Enum)]
pub enum Action {
    /// See drafts in the dashboard
    View,
    /// Create new entries
    Submit,
    /// Edit existing entries
    Revise,
    /// Delete entries
    Exclude,
    /// Publish entries
    Approve,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::View => "view",
            Action::Submit => "submit",
            Action::Revise => "revise",
            Action::Exclude => "exclude",
            Action::Approve => "approve",
        })
    }
}

impl Action {
    pub fn error(self, category_id: i64) -> async_graphql::Error {
        format!("Permission {} required for category {}", self, category_id).into()
    }
}

/// What one group may do in one category
#[derive(SimpleObject, sqlx::FromRow, Clone, Debug, Default, PartialEq, Eq)]
pub struct Permission {
    pub group_id: i64,
    pub category_id: i64,
    pub view: bool,
    pub submit: bool,
    pub revise: bool,
    pub exclude: bool,
    pub approve: bool,
}

#[derive(InputObject)]
pub struct NewPermission {
    pub group_id: i64,
    pub category_id: i64,
    #[graphql(default)]
    pub view: bool,
    #[graphql(default)]
    pub submit: bool,
    #[graphql(default)]
    pub revise: bool,
    #[graphql(default)]
    pub exclude: bool,
    #[graphql(default)]
    pub approve: bool,
}

impl Permission {
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Submit => self.submit,
            Action::Revise => self.revise,
            Action::Exclude => self.exclude,
            Action::Approve => self.approve,
        }
    }

    pub async fn for_group(group_id: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT group_id, category_id, \"view\", submit, revise, exclude, approve
             FROM permissions WHERE group_id = $1 ORDER BY category_id",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn for_group_in_category_opt(
        group_id: i64,
        category_id: i64,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as(
            "SELECT group_id, category_id, \"view\", submit, revise, exclude, approve
             FROM permissions WHERE group_id = $1 AND category_id = $2",
        )
        .bind(group_id)
        .bind(category_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set(permission: NewPermission, pool: &PgPool) -> Result<Self> {
        Group::with_id(permission.group_id, pool).await?;
        Category::with_id(permission.category_id, pool).await?;

        sqlx::query_as(
            "INSERT INTO permissions
                 (group_id, category_id, \"view\", submit, revise, exclude, approve)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (group_id, category_id) DO UPDATE SET
                 \"view\" = EXCLUDED.\"view\", submit = EXCLUDED.submit,
                 revise = EXCLUDED.revise, exclude = EXCLUDED.exclude,
                 approve = EXCLUDED.approve
             RETURNING group_id, category_id, \"view\", submit, revise, exclude, approve",
        )
        .bind(permission.group_id)
        .bind(permission.category_id)
        .bind(permission.view)
        .bind(permission.submit)
        .bind(permission.revise)
        .bind(permission.exclude)
        .bind(permission.approve)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn remove(group_id: i64, category_id: i64, pool: &PgPool) -> Result<()> {
        let result = sqlx::query("DELETE FROM permissions WHERE group_id = $1 AND category_id = $2")
            .bind(group_id)
            .bind(category_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(format!(
                "Group {} has no permissions in category {}",
                group_id, category_id
            )
            .into());
        }

        Ok(())
    }
}

/// Which rows a viewer may see, drafts included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Only approved rows
    Public,
    /// Approved rows, plus drafts in these categories
    Drafts(HashSet<i64>),
    /// Every row
    Everything,
}

impl Visibility {
    pub fn shows(&self, category_id: i64, approved: bool) -> bool {
        approved
            || match self {
                Visibility::Public => false,
                Visibility::Drafts(categories) => categories.contains(&category_id),
                Visibility::Everything => true,
            }
    }

    pub fn from_permissions(permissions: &[Permission]) -> Self {
        Visibility::Drafts(
            permissions
                .iter()
                .filter(|permission| permission.allows(Action::View))
                .map(|permission| permission.category_id)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(category_id: i64, view: bool, approve: bool) -> Permission {
        Permission {
            group_id: 1,
            category_id,
            view,
            approve,
            ..Permission::default()
        }
    }

    #[test]
    fn flags_map_to_actions() {
        let permission = Permission {
            submit: true,
            exclude: true,
            ..Permission::default()
        };

        assert!(permission.allows(Action::Submit));
        assert!(permission.allows(Action::Exclude));
        assert!(!permission.allows(Action::View));
        assert!(!permission.allows(Action::Revise));
        assert!(!permission.allows(Action::Approve));
    }

    #[test]
    fn drafts_are_hidden_without_view() {
        let visibility =
            Visibility::from_permissions(&[permission(1, true, false), permission(2, false, true)]);

        assert!(visibility.shows(1, false));
        assert!(!visibility.shows(2, false));
        assert!(!visibility.shows(3, false));
        assert!(visibility.shows(3, true));
    }

    #[test]
    fn public_and_admin_visibility() {
        assert!(!Visibility::Public.shows(1, false));
        assert!(Visibility::Public.shows(1, true));
        assert!(Visibility::Everything.shows(1, false));
    }

    #[test]
    fn permission_errors_name_action_and_category() {
        assert_eq!(
            Action::Approve.error(4).message,
            "Permission approve required for category 4"
        );
    }
}
