//! Republishing of the public JSON snapshots.
//!
//! After a mutation has been written to the database, the affected snapshots are rebuilt from
//! approved rows, uploaded to the blob store, and the edge config is pointed at the new files.
//! Nothing here is transactional with the database write: a failed republish is logged and the
//! snapshot stays stale until the next successful mutation of the same kind.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::models::meet::{MeetKind, PoolLength};
use crate::models::record::AgeCategory;

pub mod blob;
pub mod edge;
pub mod snapshot;

pub use blob::{BlobStore, HttpBlobStore, LocalBlobStore};
pub use edge::{EdgeConfig, HttpEdgeConfig, LocalEdgeConfig};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to load snapshot data: {0}")]
    Load(String),
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to write blob: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    #[error("edge config has no item named {0}")]
    MissingItem(String),
    #[error("edge config already has an item named {0}")]
    ItemExists(String),
}

/// The name of one published snapshot, used both as the blob file stem and the edge config key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SnapshotKey {
    NewsTop,
    NewsAll,
    Meets { year: i32, kind: MeetKind },
    Records { age_category: AgeCategory, pool: PoolLength },
    Seminars,
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKey::NewsTop => f.write_str("news_list_top"),
            SnapshotKey::NewsAll => f.write_str("news_list"),
            SnapshotKey::Meets { year, kind } => write!(f, "meet_{}_{}", year, kind),
            SnapshotKey::Records { age_category, pool } => {
                write!(f, "record_{}_{}", age_category, pool)
            }
            SnapshotKey::Seminars => f.write_str("seminar_list"),
        }
    }
}

impl SnapshotKey {
    pub fn file_name(&self) -> String {
        format!("{}.json", self)
    }

    /// Every record table, published or not.
    pub fn record_keys() -> impl Iterator<Item = SnapshotKey> {
        AgeCategory::ALL.into_iter().flat_map(|age_category| {
            PoolLength::ALL
                .into_iter()
                .map(move |pool| SnapshotKey::Records { age_category, pool })
        })
    }
}

#[derive(Clone)]
pub struct Publisher {
    blobs: Arc<dyn BlobStore>,
    edge: Arc<dyn EdgeConfig>,
}

impl Publisher {
    pub fn new(blobs: Arc<dyn BlobStore>, edge: Arc<dyn EdgeConfig>) -> Self {
        Self { blobs, edge }
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    pub fn edge(&self) -> &dyn EdgeConfig {
        self.edge.as_ref()
    }

    /// Uploads a snapshot and points its edge config item at it, returning the blob URL.
    pub async fn publish(
        &self,
        key: &SnapshotKey,
        snapshot: &Value,
    ) -> Result<String, PublishError> {
        let content = serde_json::to_vec_pretty(snapshot)?;
        let url = self
            .blobs
            .put(&key.file_name(), content, "application/json")
            .await?;
        debug!(%key, %url, "uploaded snapshot");

        self.point_to(&key.to_string(), &url).await?;

        Ok(url)
    }

    /// Only a missing item falls back to creating it; any other failure is the caller's.
    async fn point_to(&self, key: &str, url: &str) -> Result<(), PublishError> {
        match self.edge.update(key, url).await {
            Err(PublishError::MissingItem(_)) => {
                debug!(%key, "edge config item missing, creating it");
                self.edge.create(key, url).await
            }
            result => result,
        }
    }

    /// Like [`Publisher::publish`], but failures are only logged.
    pub async fn publish_logged(&self, key: &SnapshotKey, snapshot: &Value) -> Option<String> {
        match self.publish(key, snapshot).await {
            Ok(url) => Some(url),
            Err(error) => {
                error!(%key, %error, "failed to republish snapshot");
                None
            }
        }
    }

    /// Rebuilds and republishes the given snapshots. Never fails the caller.
    pub async fn republish(&self, keys: &[SnapshotKey], pool: &PgPool) {
        for key in keys {
            match snapshot::build(key, pool).await {
                Ok(snapshot) => {
                    self.publish_logged(key, &snapshot).await;
                }
                Err(error) => {
                    error!(key = %key, %error, "failed to build snapshot");
                }
            }
        }
    }

    /// Rebuilds every snapshot, returning how many were published.
    pub async fn republish_all(&self, pool: &PgPool) -> Result<usize, PublishError> {
        let keys = snapshot::all_keys(pool).await?;
        let mut published = 0;

        for key in &keys {
            let snapshot = snapshot::build(key, pool).await?;
            if self.publish_logged(key, &snapshot).await.is_some() {
                published += 1;
            }
        }
        info!(published, total = keys.len(), "republished all snapshots");

        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct MemoryBlobs {
        fail: bool,
        files: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobs {
        async fn put(
            &self,
            path: &str,
            content: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, PublishError> {
            if self.fail {
                return Err(PublishError::Rejected {
                    status: 503,
                    body: "unavailable".to_owned(),
                });
            }

            self.files.lock().unwrap().push((path.to_owned(), content));
            Ok(format!("https://blob.test/{}", path))
        }
    }

    /// Records every call so tests can check the update-then-create order.
    #[derive(Default)]
    struct RecordingEdge {
        inner: LocalEdgeConfig,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EdgeConfig for RecordingEdge {
        async fn update(&self, key: &str, value: &str) -> Result<(), PublishError> {
            self.calls.lock().unwrap().push(format!("update {}", key));
            self.inner.update(key, value).await
        }

        async fn create(&self, key: &str, value: &str) -> Result<(), PublishError> {
            self.calls.lock().unwrap().push(format!("create {}", key));
            self.inner.create(key, value).await
        }

        async fn get(&self, key: &str) -> Result<Option<String>, PublishError> {
            self.inner.get(key).await
        }
    }

    fn publisher(blobs: Arc<MemoryBlobs>, edge: Arc<RecordingEdge>) -> Publisher {
        Publisher::new(blobs, edge)
    }

    #[test]
    fn key_names() {
        let names: Vec<String> = vec![
            SnapshotKey::NewsTop,
            SnapshotKey::NewsAll,
            SnapshotKey::Meets {
                year: 2026,
                kind: MeetKind::International,
            },
            SnapshotKey::Records {
                age_category: AgeCategory::Junior,
                pool: PoolLength::Scm,
            },
            SnapshotKey::Seminars,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert_eq!(
            names,
            vec![
                "news_list_top",
                "news_list",
                "meet_2026_international",
                "record_junior_scm",
                "seminar_list"
            ]
        );
        assert_eq!(SnapshotKey::NewsTop.file_name(), "news_list_top.json");
    }

    #[test]
    fn every_record_table_has_a_key() {
        assert_eq!(SnapshotKey::record_keys().count(), 8);
    }

    #[tokio::test]
    async fn first_publish_creates_the_edge_item() {
        let blobs = Arc::new(MemoryBlobs::default());
        let edge = Arc::new(RecordingEdge::default());
        let publisher = publisher(blobs.clone(), edge.clone());

        let url = publisher
            .publish(&SnapshotKey::NewsTop, &json!([{"title": "Hello"}]))
            .await
            .unwrap();

        assert_eq!(url, "https://blob.test/news_list_top.json");
        assert_eq!(
            *edge.calls.lock().unwrap(),
            vec!["update news_list_top", "create news_list_top"]
        );
        assert_eq!(
            edge.get("news_list_top").await.unwrap().as_deref(),
            Some("https://blob.test/news_list_top.json")
        );

        let files = blobs.files.lock().unwrap();
        assert_eq!(files[0].0, "news_list_top.json");
        let written: Value = serde_json::from_slice(&files[0].1).unwrap();
        assert_eq!(written, json!([{"title": "Hello"}]));
    }

    /// An existing item whose update fails for another reason.
    #[derive(Default)]
    struct UnavailableEdge {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EdgeConfig for UnavailableEdge {
        async fn update(&self, key: &str, _value: &str) -> Result<(), PublishError> {
            self.calls.lock().unwrap().push(format!("update {}", key));
            Err(PublishError::Rejected {
                status: 500,
                body: "internal error".to_owned(),
            })
        }

        async fn create(&self, key: &str, _value: &str) -> Result<(), PublishError> {
            self.calls.lock().unwrap().push(format!("create {}", key));
            Err(PublishError::ItemExists(key.to_owned()))
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, PublishError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn only_missing_items_are_created() {
        let edge = Arc::new(UnavailableEdge::default());
        let publisher = Publisher::new(Arc::new(MemoryBlobs::default()), edge.clone());

        let result = publisher.publish(&SnapshotKey::NewsAll, &json!([])).await;

        assert!(matches!(
            result,
            Err(PublishError::Rejected { status: 500, .. })
        ));
        assert_eq!(*edge.calls.lock().unwrap(), vec!["update news_list"]);
    }

    #[tokio::test]
    async fn later_publishes_only_update() {
        let edge = Arc::new(RecordingEdge::default());
        let publisher = publisher(Arc::new(MemoryBlobs::default()), edge.clone());

        publisher
            .publish(&SnapshotKey::Seminars, &json!([]))
            .await
            .unwrap();
        publisher
            .publish(&SnapshotKey::Seminars, &json!([]))
            .await
            .unwrap();

        assert_eq!(
            *edge.calls.lock().unwrap(),
            vec![
                "update seminar_list",
                "create seminar_list",
                "update seminar_list"
            ]
        );
    }

    #[tokio::test]
    async fn blob_failures_are_swallowed_and_leave_edge_alone() {
        let blobs = Arc::new(MemoryBlobs {
            fail: true,
            ..MemoryBlobs::default()
        });
        let edge = Arc::new(RecordingEdge::default());
        let publisher = publisher(blobs, edge.clone());

        let url = publisher
            .publish_logged(&SnapshotKey::NewsAll, &json!([]))
            .await;

        assert_eq!(url, None);
        assert!(edge.calls.lock().unwrap().is_empty());
    }
}
