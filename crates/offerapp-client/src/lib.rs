//! # offerapp-client
//!
//! View-model layer of OfferApp: the feed with its vote tally and
//! cursor pagination, posts and comments, profiles, auth and the local
//! session. Everything talks to the backend through [`backend::Backend`].

pub mod backend;
pub mod config;
pub mod error;
pub mod navigation;
pub mod notifications;
pub mod session;
pub mod viewmodels;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use offerapp_shared::constants::APP_NAME;
use offerapp_shared::User;
use offerapp_store::{Database, ImageStore};
use tracing_subscriber::{fmt, EnvFilter};

use crate::backend::{Backend, StoreBackend};
use crate::config::ClientConfig;
use crate::navigation::Screen;
use crate::notifications::{Notifier, PushHandler};
use crate::session::SessionManager;
use crate::viewmodels::{AuthViewModel, MainViewModel, ThemeViewModel};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("offerapp_client=debug,offerapp_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Wired-up application: configuration, backend and session storage.
#[derive(Clone)]
pub struct App {
    pub config: ClientConfig,
    pub backend: Arc<dyn Backend>,
    pub session: SessionManager,
}

/// Open the local store under `config.data_dir` and build the [`App`].
pub async fn launch(config: ClientConfig) -> anyhow::Result<App> {
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let db = Database::open_at(&config.database_path()).context("opening database")?;
    let images = ImageStore::new(
        config.images_dir(),
        &config.media_base_url,
        config.max_image_bytes,
    )
    .await
    .context("opening image store")?;

    let backend: Arc<dyn Backend> = Arc::new(StoreBackend::new(db, images));
    let session = SessionManager::new(config.session_path());

    tracing::info!(
        data_dir = %config.data_dir.display(),
        page_size = config.page_size,
        "{APP_NAME} client ready"
    );
    Ok(App {
        config,
        backend,
        session,
    })
}

impl App {
    /// Main screen when the persisted flag says we are signed in, login otherwise.
    pub async fn start_destination(&self) -> Screen {
        navigation::start_destination(self.session.is_logged_in().await)
    }

    pub async fn auth_view_model(&self) -> AuthViewModel {
        AuthViewModel::new(Arc::clone(&self.backend), self.session.clone()).await
    }

    pub fn main_view_model(&self, user: User) -> MainViewModel {
        MainViewModel::new(Arc::clone(&self.backend), user, self.config.page_size)
    }

    pub async fn theme_view_model(&self) -> ThemeViewModel {
        ThemeViewModel::new(self.session.clone()).await
    }

    pub fn push_handler(&self, notifier: Arc<dyn Notifier>) -> PushHandler {
        PushHandler::new(Arc::clone(&self.backend), notifier)
    }
}
