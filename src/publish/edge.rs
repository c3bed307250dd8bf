use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use super::PublishError;

/// A key-value store read by the public pages to find the current snapshot files.
#[async_trait]
pub trait EdgeConfig: Send + Sync {
    /// Changes an existing item. Fails if the item doesn't exist yet.
    async fn update(&self, key: &str, value: &str) -> Result<(), PublishError>;
    /// Adds a new item. Fails if the item already exists.
    async fn create(&self, key: &str, value: &str) -> Result<(), PublishError>;
    async fn get(&self, key: &str) -> Result<Option<String>, PublishError>;
}

pub struct HttpEdgeConfig {
    client: reqwest::Client,
    api_url: String,
    config_id: String,
    token: String,
}

#[derive(Deserialize)]
struct EdgeItem {
    value: serde_json::Value,
}

impl HttpEdgeConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.vercel.com/v1/edge-config";

    pub fn new(
        api_url: impl Into<String>,
        config_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            config_id: config_id.into(),
            token: token.into(),
        }
    }

    async fn patch(&self, operation: &str, key: &str, value: &str) -> Result<(), PublishError> {
        let response = self
            .client
            .patch(format!("{}/{}/items", self.api_url, self.config_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&json!({
                "items": [{ "operation": operation, "key": key, "value": value }]
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(patch_error(operation, key, status, body))
        }
    }
}

/// Missing and duplicate items get their own errors so callers can tell them from outages.
fn patch_error(operation: &str, key: &str, status: StatusCode, body: String) -> PublishError {
    let lowered = body.to_lowercase();
    match operation {
        "update"
            if status == StatusCode::NOT_FOUND
                || lowered.contains("not found")
                || lowered.contains("not_found")
                || lowered.contains("does not exist") =>
        {
            PublishError::MissingItem(key.to_owned())
        }
        "create" if status == StatusCode::CONFLICT || lowered.contains("already exist") => {
            PublishError::ItemExists(key.to_owned())
        }
        _ => PublishError::Rejected {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl EdgeConfig for HttpEdgeConfig {
    async fn update(&self, key: &str, value: &str) -> Result<(), PublishError> {
        self.patch("update", key, value).await
    }

    async fn create(&self, key: &str, value: &str) -> Result<(), PublishError> {
        self.patch("create", key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PublishError> {
        let response = self
            .client
            .get(format!("{}/{}/item/{}", self.api_url, self.config_id, key))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let item: EdgeItem = response.json().await?;
                Ok(Some(match item.value {
                    serde_json::Value::String(value) => value,
                    other => other.to_string(),
                }))
            }
            status => Err(PublishError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

/// An in-process edge config for running without the hosted one.
#[derive(Default)]
pub struct LocalEdgeConfig {
    items: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl EdgeConfig for LocalEdgeConfig {
    async fn update(&self, key: &str, value: &str) -> Result<(), PublishError> {
        let mut items = self.items.write().await;
        match items.get_mut(key) {
            Some(existing) => {
                *existing = value.to_owned();
                Ok(())
            }
            None => Err(PublishError::MissingItem(key.to_owned())),
        }
    }

    async fn create(&self, key: &str, value: &str) -> Result<(), PublishError> {
        let mut items = self.items.write().await;
        if items.contains_key(key) {
            return Err(PublishError::ItemExists(key.to_owned()));
        }

        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PublishError> {
        Ok(self.items.read().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_requires_existing_item() {
        let edge = LocalEdgeConfig::default();

        assert!(matches!(
            edge.update("news_list", "a").await,
            Err(PublishError::MissingItem(_))
        ));
        edge.create("news_list", "a").await.unwrap();
        edge.update("news_list", "b").await.unwrap();

        assert_eq!(edge.get("news_list").await.unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn hosted_errors_are_classified() {
        assert!(matches!(
            patch_error("update", "news_list", StatusCode::NOT_FOUND, String::new()),
            PublishError::MissingItem(key) if key == "news_list"
        ));
        assert!(matches!(
            patch_error(
                "update",
                "news_list",
                StatusCode::BAD_REQUEST,
                r#"{"error":{"code":"edge_config_item_not_found"}}"#.to_owned()
            ),
            PublishError::MissingItem(_)
        ));
        assert!(matches!(
            patch_error("create", "news_list", StatusCode::CONFLICT, String::new()),
            PublishError::ItemExists(_)
        ));
        assert!(matches!(
            patch_error(
                "update",
                "news_list",
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream timeout".to_owned()
            ),
            PublishError::Rejected { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn create_refuses_duplicates() {
        let edge = LocalEdgeConfig::default();
        edge.create("seminar_list", "a").await.unwrap();

        assert!(matches!(
            edge.create("seminar_list", "b").await,
            Err(PublishError::ItemExists(_))
        ));
        assert_eq!(edge.get("missing").await.unwrap(), None);
    }
}
