use std::path::PathBuf;

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql::{Request, Response};
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query};
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, get_service, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::email::MailSettings;
use crate::error::{AppError, AppResult};
use crate::file::UploadedFile;
use crate::graphql::FederationSchema;
use crate::models::user::User;
use crate::publish::Publisher;

pub const TOKEN_HEADER: &str = "token";
pub const GRAPHQL_PATH: &str = "/graphql";

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub publisher: Publisher,
    pub mail: MailSettings,
    pub schema: FederationSchema,
}

/// Which local stores this server should expose, if any.
#[derive(Clone, Debug, Default)]
pub struct LocalStores {
    pub blob_dir: Option<PathBuf>,
    pub edge: bool,
}

pub fn app(state: AppState, local: LocalStores) -> Router {
    let mut router = Router::new()
        .route(GRAPHQL_PATH, get(playground).post(graphql))
        .route("/upload", post(upload))
        .route("/health", get(health));

    if let Some(dir) = local.blob_dir {
        router = router.nest(
            "/blob",
            get_service(ServeDir::new(dir)).handle_error(|err: std::io::Error| async move {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to read blob: {}", err),
                )
            }),
        );
    }
    if local.edge {
        router = router.route("/edge/:key", get(edge_item));
    }

    router
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn graphql(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(request): Json<Request>,
) -> AppResult<Json<Response>> {
    let user = current_user(&headers, &state.pool).await?;

    let request = request
        .data(state.pool.clone())
        .data(state.publisher.clone())
        .data(state.mail.clone());
    let request = if let Some(user) = user {
        request.data(user)
    } else {
        request
    };

    Ok(Json(state.schema.execute(request).await))
}

async fn playground(headers: HeaderMap) -> AppResult<Html<String>> {
    let mut config = GraphQLPlaygroundConfig::new(GRAPHQL_PATH);
    if let Some(token) = get_token(&headers)? {
        config = config.with_header(TOKEN_HEADER, token);
    }

    Ok(Html(playground_source(config)))
}

#[derive(Deserialize)]
struct UploadParams {
    filename: String,
}

async fn upload(
    Extension(state): Extension<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let user = current_user(&headers, &state.pool)
        .await?
        .ok_or(AppError::NotAuthenticated)?;

    let file = UploadedFile::new(&params.filename, body.to_vec())?;
    let url = file.save(state.publisher.blobs()).await?;
    info!(user = user.id, %url, "uploaded file");

    Ok(Json(json!({ "url": url })))
}

async fn edge_item(
    Extension(state): Extension<AppState>,
    Path(key): Path<String>,
) -> AppResult<String> {
    state
        .publisher
        .edge()
        .get(&key)
        .await?
        .ok_or(AppError::NotFound)
}

async fn health() -> &'static str {
    "ok"
}

/// A missing token means an anonymous request; a token with no session is an error.
async fn current_user(headers: &HeaderMap, pool: &PgPool) -> AppResult<Option<User>> {
    match get_token(headers)? {
        Some(token) => User::with_token_opt(token, pool)
            .await?
            .ok_or(AppError::NotAuthenticated)
            .map(Some),
        None => Ok(None),
    }
}

fn get_token(headers: &HeaderMap) -> AppResult<Option<&str>> {
    headers
        .get(TOKEN_HEADER)
        .map(|value| value.to_str().map_err(AppError::InvalidTokenHeader))
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    #[tokio::test]
    async fn unreachable_database_is_not_a_bad_token() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://swimfed@127.0.0.1:1/swimfed")
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_static("3f0c2b"));

        let error = current_user(&headers, &pool).await.unwrap_err();

        assert!(matches!(error, AppError::Database(_)));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_comes_from_its_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(get_token(&headers).unwrap(), None);

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("3f0c2b"));
        assert_eq!(get_token(&headers).unwrap(), Some("3f0c2b"));
    }

    #[test]
    fn unreadable_tokens_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_bytes(b"caf\xe9").unwrap());

        assert!(matches!(
            get_token(&headers),
            Err(AppError::InvalidTokenHeader(_))
        ));
    }
}
