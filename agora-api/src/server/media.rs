use crate::server::{Result, ServerError};
use agora_common::upload::{UploadDir, upload_path};
use axum::extract::Multipart;
use std::path::{Path, PathBuf};
use tracing::info;

/// Uploaded files on local disk, served back under `/media`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Saves the file in the multipart field `field_name` and returns its path relative to the
    /// media root.
    pub async fn store_upload(
        &self,
        mut multipart: Multipart,
        field_name: &'static str,
        dir: UploadDir,
        title: &str,
    ) -> Result<String> {
        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(field_name) {
                continue;
            }

            let filename = field.file_name().unwrap_or_default().to_owned();
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                return Err(ServerError::MissingUpload(field_name));
            }

            let relative = upload_path(dir, title, &filename);
            let full = self.root.join(&relative);
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(ServerError::Media)?;
            }
            tokio::fs::write(&full, &bytes)
                .await
                .map_err(ServerError::Media)?;

            info!(path = %relative, size = bytes.len(), "Stored upload");
            return Ok(relative);
        }

        Err(ServerError::MissingUpload(field_name))
    }
}
