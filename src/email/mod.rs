//! Notification emails, sent through mailgun.

use anyhow::Context;
use askama::Template;
use mailgun_v3::email::{self, Message, MessageBody};
use mailgun_v3::{Credentials, EmailAddress};

pub mod sponsorship;

pub const MAILGUN_NAME: &str = "Swimming Federation";
pub const MAILGUN_EMAIL: &str = "noreply@mail.swimfed.org";
pub const MAILGUN_DOMAIN: &str = "mail.swimfed.org";

/// Where notifications go, and whether mail can be sent at all.
#[derive(Clone, Debug)]
pub struct MailSettings {
    pub enabled: bool,
    pub office_address: String,
}

pub trait Email: Template {
    fn subject(&self) -> String;
    fn address(&self) -> EmailAddress;
}

pub async fn send_email(email: impl Email) -> anyhow::Result<()> {
    let token = std::env::var("MAILGUN_TOKEN").context("`MAILGUN_TOKEN` not set")?;
    let creds = Credentials::new(&token, MAILGUN_DOMAIN);

    let sender = EmailAddress::name_address(MAILGUN_NAME, MAILGUN_EMAIL);
    let message = Message {
        to: vec![email.address()],
        subject: email.subject(),
        body: MessageBody::Html(email.render().context("Failed to render email")?),
        ..Default::default()
    };

    email::async_impl::send_email(&creds, &sender, message)
        .await
        .map(|_| ())
        .map_err(|err| anyhow::anyhow!("Failed to send email: {err}"))
}
