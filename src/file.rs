//! Uploaded files, for attaching documents and images to content

use std::path::Path;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::publish::BlobStore;

pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    const UPLOAD_DIR: &'static str = "uploads";

    pub fn new(file_name: &str, content: Vec<u8>) -> AppResult<Self> {
        if content.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_owned()));
        }

        Ok(Self {
            name: Self::sanitize(file_name)?,
            content,
        })
    }

    /// Keeps the last path segment, replacing anything unusual in it with dashes.
    pub fn sanitize(file_name: &str) -> AppResult<String> {
        let base = file_name
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or_default()
            .trim();

        let cleaned: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let cleaned = cleaned.trim_matches(|c| c == '.' || c == '-').to_owned();

        match Path::new(&cleaned).extension() {
            Some(extension) if !extension.is_empty() => Ok(cleaned),
            _ => Err(AppError::BadRequest(format!(
                "File name {} needs an extension",
                file_name
            ))),
        }
    }

    pub fn content_type(&self) -> &'static str {
        let extension = Path::new(&self.name)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => "application/pdf",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("txt") => "text/plain",
            Some("csv") => "text/csv",
            Some("json") => "application/json",
            Some("doc") => "application/msword",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Some("xls") => "application/vnd.ms-excel",
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            _ => "application/octet-stream",
        }
    }

    pub fn storage_path(&self, id: Uuid) -> String {
        format!("{}/{}-{}", Self::UPLOAD_DIR, id, self.name)
    }

    /// Writes the file to the blob store under a fresh name and returns its public URL.
    pub async fn save(self, blobs: &dyn BlobStore) -> AppResult<String> {
        let path = self.storage_path(Uuid::new_v4());
        let content_type = self.content_type();

        blobs
            .put(&path, self.content, content_type)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::LocalBlobStore;

    #[test]
    fn names_are_sanitized() {
        assert_eq!(
            UploadedFile::sanitize("../../Start List (final).pdf").unwrap(),
            "Start-List--final-.pdf"
        );
        assert_eq!(
            UploadedFile::sanitize("C:\\results\\heats.xlsx").unwrap(),
            "heats.xlsx"
        );
    }

    #[test]
    fn names_need_an_extension() {
        assert!(UploadedFile::sanitize("results").is_err());
        assert!(UploadedFile::sanitize("results.").is_err());
        assert!(UploadedFile::sanitize("").is_err());
    }

    #[test]
    fn empty_uploads_are_rejected() {
        assert!(matches!(
            UploadedFile::new("entries.pdf", Vec::new()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn stored_under_uploads_with_a_unique_prefix() {
        let file = UploadedFile::new("entries.PDF", b"%PDF".to_vec()).unwrap();
        let id = Uuid::nil();

        assert_eq!(
            file.storage_path(id),
            "uploads/00000000-0000-0000-0000-000000000000-entries.PDF"
        );
        assert_eq!(file.content_type(), "application/pdf");
    }

    #[tokio::test]
    async fn saving_writes_to_the_blob_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost:3000");
        let file = UploadedFile::new("poster.png", vec![1, 2, 3]).unwrap();

        let url = file.save(&store).await.unwrap();

        assert!(url.starts_with("http://localhost:3000/blob/uploads/"));
        assert!(url.ends_with("-poster.png"));
        let uploads: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .collect();
        assert_eq!(uploads.len(), 1);
    }
}
