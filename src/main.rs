use anyhow::{anyhow, Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swimfed::config::Config;
use swimfed::graphql::build_schema;
use swimfed::models::user::User;
use swimfed::routes::{app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    if let Some(admin) = &config.initial_admin {
        let created = User::bootstrap_admin(admin.new_user(), &pool)
            .await
            .map_err(|err| anyhow!("Failed to create the initial admin: {}", err.message))?;
        if let Some(id) = created {
            info!(id, email = %admin.email, "created initial admin");
        }
    }

    let state = AppState {
        pool,
        publisher: config.publisher(),
        mail: config.mail_settings(),
        schema: build_schema(),
    };
    let app = app(state, config.local_stores());

    info!(address = %config.bind_address, "listening");
    axum::Server::bind(&config.bind_address)
        .serve(app.into_make_service())
        .await
        .context("Server failed")
}
