use async_graphql::{Enum, InputObject, Result, SimpleObject};
use sqlx::PgPool;

use crate::models::DateTime;
use crate::util::{check_length, current_time};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Enum, sqlx::Type)]
#[sqlx(type_name = "sponsorship_status", rename_all = "snake_case")]
pub enum SponsorshipStatus {
    Pending,
    Accepted,
    Dismissed,
}

/// A company's offer to sponsor the federation
#[derive(SimpleObject, sqlx::FromRow, Clone, Debug)]
pub struct SponsorshipApplication {
    /// The ID of the application
    pub id: i64,
    /// The company applying
    pub company: String,
    /// Who to get back to
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    /// What the company is offering
    pub message: String,
    /// Whether the federation has acted on the application
    pub status: SponsorshipStatus,
    /// When the application was sent
    pub submitted_at: DateTime,
}

/// A new sponsorship application, sent from the public site
#[derive(InputObject)]
pub struct NewSponsorshipApplication {
    pub company: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub message: String,
}

impl NewSponsorshipApplication {
    pub fn validate(&self) -> Result<()> {
        check_length("company", &self.company, 1, 256)?;
        check_length("contact name", &self.contact_name, 1, 128)?;
        check_length("contact phone", &self.contact_phone, 3, 32)?;
        check_length("message", &self.message, 1, 10_000)?;
        if !self.contact_email.contains('@') {
            return Err("contact email must be a valid email address".into());
        }

        Ok(())
    }
}

const COLUMNS: &str = "id, company, contact_name, contact_email, contact_phone, message,
    status, submitted_at";

impl SponsorshipApplication {
    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| "Sponsorship application ID does not exist".into())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM sponsorship_applications WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM sponsorship_applications ORDER BY submitted_at DESC",
            COLUMNS
        ))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn submit(application: NewSponsorshipApplication, pool: &PgPool) -> Result<i64> {
        application.validate()?;

        sqlx::query_scalar(
            "INSERT INTO sponsorship_applications
                 (company, contact_name, contact_email, contact_phone, message, submitted_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(application.company.trim())
        .bind(application.contact_name.trim())
        .bind(application.contact_email.trim())
        .bind(application.contact_phone.trim())
        .bind(&application.message)
        .bind(current_time())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_status(id: i64, status: SponsorshipStatus, pool: &PgPool) -> Result<()> {
        let application = Self::with_id(id, pool).await?;
        application.status.ensure_can_become(status)?;

        sqlx::query("UPDATE sponsorship_applications SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

impl SponsorshipStatus {
    pub fn ensure_can_become(self, next: SponsorshipStatus) -> Result<()> {
        match (self, next) {
            (current, next) if current == next => Ok(()),
            (SponsorshipStatus::Accepted, _) => {
                Err("Cannot change the status of an accepted sponsorship application".into())
            }
            (SponsorshipStatus::Dismissed, SponsorshipStatus::Accepted) => Err(
                "Cannot directly accept a dismissed application (please reopen it first)".into(),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_applications_are_final() {
        assert!(SponsorshipStatus::Accepted
            .ensure_can_become(SponsorshipStatus::Dismissed)
            .is_err());
        assert!(SponsorshipStatus::Accepted
            .ensure_can_become(SponsorshipStatus::Accepted)
            .is_ok());
    }

    #[test]
    fn dismissed_applications_must_be_reopened_first() {
        assert!(SponsorshipStatus::Dismissed
            .ensure_can_become(SponsorshipStatus::Accepted)
            .is_err());
        assert!(SponsorshipStatus::Dismissed
            .ensure_can_become(SponsorshipStatus::Pending)
            .is_ok());
        assert!(SponsorshipStatus::Pending
            .ensure_can_become(SponsorshipStatus::Accepted)
            .is_ok());
    }

    #[test]
    fn applications_need_a_reachable_contact() {
        let application = NewSponsorshipApplication {
            company: "Aqua Sports d.o.o.".to_owned(),
            contact_name: "Iva Kovač".to_owned(),
            contact_email: "iva.example.com".to_owned(),
            contact_phone: "+385 1 234 567".to_owned(),
            message: "We would like to sponsor the junior championships.".to_owned(),
        };
        assert!(application.validate().is_err());

        let fixed = NewSponsorshipApplication {
            contact_email: "iva@example.com".to_owned(),
            ..application
        };
        assert!(fixed.validate().is_ok());
    }
}
