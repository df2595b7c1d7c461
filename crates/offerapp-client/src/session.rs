//! Local session preferences: the logged-in flag and the theme.
//!
//! Stored as a small JSON file. A missing or unreadable file reads as the
//! defaults (`false` / `false`); writes go through a temp file and a rename.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPrefs {
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub is_dark_mode: bool,
}

/// Handle to the session file. Cheap to clone; clones share one write lock.
#[derive(Debug, Clone)]
pub struct SessionManager {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SessionManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> SessionPrefs {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SessionPrefs::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file unreadable");
                return SessionPrefs::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "corrupt session file");
            SessionPrefs::default()
        })
    }

    pub async fn is_logged_in(&self) -> bool {
        self.load().await.is_logged_in
    }

    pub async fn is_dark_mode(&self) -> bool {
        self.load().await.is_dark_mode
    }

    pub async fn save_session_state(&self, is_logged_in: bool) -> Result<()> {
        self.update(|prefs| prefs.is_logged_in = is_logged_in).await
    }

    pub async fn save_theme(&self, is_dark_mode: bool) -> Result<()> {
        self.update(|prefs| prefs.is_dark_mode = is_dark_mode).await
    }

    /// Wipe both flags.
    pub async fn clear_session(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ClientError::Session(e.to_string())),
        }
        tracing::debug!("session cleared");
        Ok(())
    }

    async fn update(&self, edit: impl FnOnce(&mut SessionPrefs)) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut prefs = self.load().await;
        edit(&mut prefs);

        let json =
            serde_json::to_vec_pretty(&prefs).map_err(|e| ClientError::Session(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Session(e.to_string()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| ClientError::Session(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ClientError::Session(e.to_string()))?;

        tracing::debug!(?prefs, "session saved");
        Ok(())
    }
}
