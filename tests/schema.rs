use async_graphql::Request;
use sqlx::postgres::PgPoolOptions;
use swimfed::email::MailSettings;
use swimfed::graphql::build_schema;
use swimfed::models::user::User;

fn editor(admin: bool) -> User {
    User {
        id: 3,
        name: "Marta Horvat".to_owned(),
        email: "marta@swimfed.org".to_owned(),
        group_id: Some(2),
        admin,
    }
}

async fn first_error(request: impl Into<Request>) -> String {
    let response = build_schema().execute(request).await;
    assert!(!response.errors.is_empty(), "expected an error");

    response.errors[0].message.clone()
}

#[tokio::test]
async fn anonymous_mutations_are_rejected() {
    let mutations = [
        r#"mutation { createNews(newNews: { categoryId: 1, title: "Hi", content: "There" }) { id } }"#,
        "mutation { approveMeet(id: 4) { id } }",
        "mutation { deleteRecord(id: 9) }",
        r#"mutation { updateSeminar(id: 1, update: { categoryId: 1, title: "Clinic", description: "Turns", date: "2026-11-02", location: "Zagreb" }) { id } }"#,
        "mutation { logout }",
        "mutation { republishAll }",
    ];

    for mutation in mutations {
        assert_eq!(first_error(mutation).await, "Not authenticated", "{}", mutation);
    }
}

#[tokio::test]
async fn admin_mutations_need_an_admin() {
    let request = Request::new(r#"mutation { createGroup(name: "Coaches") { id } }"#)
        .data(editor(false));
    assert_eq!(first_error(request).await, "Admin access required");

    let request =
        Request::new("mutation { setSponsorshipStatus(id: 1, status: ACCEPTED) { id } }");
    assert_eq!(first_error(request).await, "Not authenticated");
}

#[tokio::test]
async fn user_is_whoever_the_token_belongs_to() {
    let schema = build_schema();

    let anonymous = schema.execute("{ user { id } }").await;
    assert!(anonymous.errors.is_empty());
    assert_eq!(
        anonymous.data.into_json().unwrap(),
        serde_json::json!({ "user": null })
    );

    let signed_in = schema
        .execute(Request::new("{ user { name admin } }").data(editor(true)))
        .await;
    assert_eq!(
        signed_in.data.into_json().unwrap(),
        serde_json::json!({ "user": { "name": "Marta Horvat", "admin": true } })
    );
}

#[tokio::test]
async fn sponsorship_applications_are_validated_before_saving() {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/swimfed_unreachable")
        .unwrap();
    let request = Request::new(
        r#"mutation {
            submitSponsorshipApplication(application: {
                company: "Aqua Sports",
                contactName: "Iva Kovač",
                contactEmail: "not-an-email",
                contactPhone: "+385 1 234 567",
                message: "Junior championships"
            }) { id }
        }"#,
    )
    .data(pool)
    .data(MailSettings {
        enabled: false,
        office_address: "office@swimfed.org".to_owned(),
    });

    assert_eq!(
        first_error(request).await,
        "contact email must be a valid email address"
    );
}
