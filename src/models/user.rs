use async_graphql::{InputObject, Result, SimpleObject};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::group::Group;
use crate::models::permissions::{Action, Permission, Visibility};
use crate::util::check_length;

/// Someone who can sign in to the dashboard
#[derive(SimpleObject, sqlx::FromRow, Clone, Debug)]
pub struct User {
    /// The ID of the user
    pub id: i64,
    /// Their full name
    pub name: String,
    /// The email they sign in with
    pub email: String,
    /// The group that decides their permissions
    pub group_id: Option<i64>,
    /// Admins can do everything
    pub admin: bool,
}

#[derive(InputObject)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub group_id: Option<i64>,
    #[graphql(default)]
    pub admin: bool,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        check_length("name", &self.name, 1, 128)?;
        check_length("password", &self.password, 8, 128)?;
        if !self.email.contains('@') {
            return Err("email must be a valid email address".into());
        }

        Ok(())
    }
}

impl User {
    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| "User ID does not exist".into())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as("SELECT id, name, email, group_id, admin FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn with_email_opt(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as("SELECT id, name, email, group_id, admin FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Keeps database failures apart from tokens that match no session.
    pub async fn with_token_opt(token: &str, pool: &PgPool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(
            "SELECT users.id, name, email, group_id, admin FROM users
             INNER JOIN sessions ON sessions.user_id = users.id
             WHERE sessions.token = $1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as("SELECT id, name, email, group_id, admin FROM users ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Returns the user's ID if the password matches.
    pub async fn check_login(email: &str, password: &str, pool: &PgPool) -> Result<Option<i64>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, pass_hash FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(pool)
                .await?;

        match row {
            Some((id, pass_hash)) => {
                let valid = bcrypt::verify(password, &pass_hash)
                    .map_err(|err| format!("Failed to check password: {}", err))?;
                Ok(valid.then(|| id))
            }
            None => Ok(None),
        }
    }

    pub async fn register(new_user: NewUser, pool: &PgPool) -> Result<i64> {
        new_user.validate()?;
        if Self::with_email_opt(&new_user.email, pool).await?.is_some() {
            return Err(format!("A user with email {} already exists", new_user.email).into());
        }
        if let Some(group_id) = new_user.group_id {
            Group::with_id(group_id, pool).await?;
        }

        let pass_hash = bcrypt::hash(&new_user.password, 10)
            .map_err(|err| format!("Failed to hash password: {}", err))?;

        sqlx::query_scalar(
            "INSERT INTO users (name, email, pass_hash, group_id, admin)
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(new_user.name.trim())
        .bind(&new_user.email)
        .bind(pass_hash)
        .bind(new_user.group_id)
        .bind(new_user.admin)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Registers `admin` if nobody has been registered yet, so a fresh database can be signed in to.
    pub async fn bootstrap_admin(admin: NewUser, pool: &PgPool) -> Result<Option<i64>> {
        admin.validate()?;
        if !admin.admin {
            return Err("The first user must be an admin".into());
        }

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        if users > 0 {
            return Ok(None);
        }

        Self::register(admin, pool).await.map(Some)
    }

    pub async fn set_group(id: i64, group_id: Option<i64>, pool: &PgPool) -> Result<()> {
        Self::with_id(id, pool).await?;
        if let Some(group_id) = group_id {
            Group::with_id(group_id, pool).await?;
        }

        sqlx::query("UPDATE users SET group_id = $1 WHERE id = $2")
            .bind(group_id)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn can(&self, action: Action, category_id: i64, pool: &PgPool) -> Result<bool> {
        if self.admin {
            return Ok(true);
        }
        let Some(group_id) = self.group_id else {
            return Ok(false);
        };

        let permission = Permission::for_group_in_category_opt(group_id, category_id, pool).await?;
        Ok(permission.map_or(false, |permission| permission.allows(action)))
    }

    pub async fn ensure_can(&self, action: Action, category_id: i64, pool: &PgPool) -> Result<()> {
        if self.can(action, category_id, pool).await? {
            Ok(())
        } else {
            Err(action.error(category_id))
        }
    }

    pub async fn visibility(&self, pool: &PgPool) -> Result<Visibility> {
        if self.admin {
            return Ok(Visibility::Everything);
        }

        match self.group_id {
            Some(group_id) => {
                let permissions = Permission::for_group(group_id, pool).await?;
                Ok(Visibility::from_permissions(&permissions))
            }
            None => Ok(Visibility::Public),
        }
    }
}

pub struct Session;

impl Session {
    pub async fn get_or_generate_token(user_id: i64, pool: &PgPool) -> Result<String> {
        User::with_id(user_id, pool).await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT token FROM sessions WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        if let Some(token) = existing {
            return Ok(token);
        }

        let token = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO sessions (user_id, token) VALUES ($1, $2)")
            .bind(user_id)
            .bind(&token)
            .execute(pool)
            .await?;

        Ok(token)
    }

    pub async fn remove(user_id: i64, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;

    use super::*;

    fn admin(password: &str) -> NewUser {
        NewUser {
            name: "Federation Office".to_owned(),
            email: "office@swimfed.org".to_owned(),
            password: password.to_owned(),
            group_id: None,
            admin: true,
        }
    }

    fn unreachable_pool() -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://swimfed@127.0.0.1:1/swimfed")
            .unwrap()
    }

    #[test]
    fn new_users_are_validated() {
        assert!(admin("long enough").validate().is_ok());
        assert_eq!(
            admin("short").validate().unwrap_err().message,
            "password must be between 8 and 128 characters"
        );
        let no_email = NewUser {
            email: "office".to_owned(),
            ..admin("long enough")
        };
        assert!(no_email.validate().is_err());
    }

    #[tokio::test]
    async fn bootstrap_checks_the_admin_before_touching_the_database() {
        let pool = unreachable_pool();

        let error = User::bootstrap_admin(admin("short"), &pool)
            .await
            .unwrap_err();
        assert_eq!(error.message, "password must be between 8 and 128 characters");

        let not_admin = NewUser {
            admin: false,
            ..admin("long enough")
        };
        let error = User::bootstrap_admin(not_admin, &pool).await.unwrap_err();
        assert_eq!(error.message, "The first user must be an admin");
    }
}
