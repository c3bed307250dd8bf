use askama::Template;
use mailgun_v3::EmailAddress;

use crate::email::Email;
use crate::models::sponsorship::SponsorshipApplication;

/// Tells the federation office a sponsorship application came in
#[derive(Template)]
#[template(path = "sponsorship_application.html")]
pub struct NewSponsorshipEmail<'a> {
    pub application: &'a SponsorshipApplication,
    pub office_address: &'a str,
}

impl<'a> Email for NewSponsorshipEmail<'a> {
    fn subject(&self) -> String {
        format!("Sponsorship application from {}", self.application.company)
    }

    fn address(&self) -> EmailAddress {
        EmailAddress::address(self.office_address)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::models::sponsorship::SponsorshipStatus;
    use crate::models::DateTime;

    #[test]
    fn lists_the_contact_details() {
        let application = SponsorshipApplication {
            id: 7,
            company: "Aqua Sports".to_owned(),
            contact_name: "Iva Kovač".to_owned(),
            contact_email: "iva@example.com".to_owned(),
            contact_phone: "+385 1 234 567".to_owned(),
            message: "Junior championships & relays".to_owned(),
            status: SponsorshipStatus::Pending,
            submitted_at: DateTime(datetime!(2026-10-18 9:00 UTC)),
        };
        let email = NewSponsorshipEmail {
            application: &application,
            office_address: "office@swimfed.org",
        };

        let body = email.render().unwrap();

        assert_eq!(email.subject(), "Sponsorship application from Aqua Sports");
        assert!(body.contains("iva@example.com"));
        assert!(body.contains("Junior championships &amp; relays"));
    }
}
