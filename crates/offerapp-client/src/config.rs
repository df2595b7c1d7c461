//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the client can start with zero
//! configuration.

use std::path::PathBuf;

use directories::ProjectDirs;
use offerapp_shared::constants::{DEFAULT_PAGE_SIZE, MAX_IMAGE_SIZE};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Directory holding the database, the image store and the session file.
    /// Env: `OFFERAPP_DATA_DIR`
    /// Default: the platform data directory, or `./offerapp-data`.
    pub data_dir: PathBuf,

    /// Posts requested per feed page.
    /// Env: `OFFERAPP_PAGE_SIZE`
    /// Default: `10`
    pub page_size: u32,

    /// Prefix of the URLs handed out for uploaded images.
    /// Env: `OFFERAPP_MEDIA_BASE_URL`
    /// Default: `file://<data_dir>/images`
    pub media_base_url: String,

    /// Largest accepted image upload in bytes.
    /// Env: `OFFERAPP_MAX_IMAGE_BYTES`
    /// Default: 10 MiB
    pub max_image_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_data_dir(default_data_dir())
    }
}

impl ClientConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let media_base_url = format!("file://{}", data_dir.join("images").display());
        Self {
            data_dir,
            page_size: DEFAULT_PAGE_SIZE,
            media_base_url,
            max_image_bytes: MAX_IMAGE_SIZE,
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match get("OFFERAPP_DATA_DIR") {
            Some(dir) if !dir.trim().is_empty() => Self::with_data_dir(PathBuf::from(dir)),
            _ => Self::default(),
        };

        if let Some(val) = get("OFFERAPP_PAGE_SIZE") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.page_size = n,
                _ => tracing::warn!(value = %val, "Invalid OFFERAPP_PAGE_SIZE, using default"),
            }
        }

        if let Some(url) = get("OFFERAPP_MEDIA_BASE_URL") {
            if !url.trim().is_empty() {
                config.media_base_url = url.trim_end_matches('/').to_string();
            }
        }

        if let Some(val) = get("OFFERAPP_MAX_IMAGE_BYTES") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_image_bytes = n,
                _ => tracing::warn!(value = %val, "Invalid OFFERAPP_MAX_IMAGE_BYTES, using default"),
            }
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("offerapp.db")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "offerapp", "offerapp")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./offerapp-data"))
}
