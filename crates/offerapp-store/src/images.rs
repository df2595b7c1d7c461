//! On-disk image storage for post pictures and profile photos.
//!
//! Each upload is written to `<base_path>/<uuid>` and addressed by the URL
//! `<base_url>/<uuid>`. Only URLs under `base_url` whose last segment parses
//! as a UUID resolve to a file, so callers can never reach outside the
//! directory.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
    base_url: String,
    max_size: usize,
}

impl ImageStore {
    pub async fn new(base_path: PathBuf, base_url: &str, max_size: usize) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), base_url, "image store initialized");

        Ok(Self {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Store the bytes and return the public URL.
    pub async fn upload(&self, data: &[u8]) -> Result<String> {
        if data.is_empty() {
            return Err(StoreError::EmptyImage);
        }
        if data.len() > self.max_size {
            return Err(StoreError::ImageTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let id = Uuid::new_v4();
        fs::write(self.base_path.join(id.to_string()), data).await?;

        debug!(%id, size = data.len(), "stored image");
        Ok(format!("{}/{}", self.base_url, id))
    }

    pub async fn read(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.path_for(url)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove an uploaded image. Returns `false` if it was already gone.
    pub async fn delete(&self, url: &str) -> Result<bool> {
        let path = self.path_for(url)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(url, "deleted image");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, url: &str) -> Result<PathBuf> {
        let id = url
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|name| Uuid::parse_str(name).ok())
            .ok_or(StoreError::NotFound)?;
        Ok(self.base_path.join(id.to_string()))
    }
}
