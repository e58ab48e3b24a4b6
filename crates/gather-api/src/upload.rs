//! Image-upload collaborator.
//!
//! Uploaded event images are written under one configured directory with a
//! fresh UUID name (the client's filename contributes only its extension)
//! and referenced from events by their public `/uploads/...` path. Serving
//! the directory over HTTP is the server binary's concern.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

use crate::error::ApiError;

pub struct ImageStore {
  root: PathBuf,
}

impl ImageStore {
  /// Create the upload directory (if needed) and return a store rooted in it.
  pub async fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(ImageStore { root })
  }

  /// Build a store without touching the filesystem. The directory must
  /// already exist before [`save`](Self::save) is called.
  pub fn unchecked(root: impl Into<PathBuf>) -> Self {
    ImageStore { root: root.into() }
  }

  /// Persist an uploaded image and return its public `/uploads/...` path.
  pub async fn save(
    &self,
    original_name: &str,
    bytes: Bytes,
  ) -> Result<String, ApiError> {
    let ext = Path::new(original_name)
      .extension()
      .and_then(|e| e.to_str())
      .unwrap_or("bin");
    let name = format!("{}.{ext}", Uuid::new_v4());

    tokio::fs::write(self.root.join(&name), &bytes)
      .await
      .map_err(|e| ApiError::Internal(format!("image write failed: {e}")))?;

    Ok(format!("/uploads/{name}"))
  }
}
