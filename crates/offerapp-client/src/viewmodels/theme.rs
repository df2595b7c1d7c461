//! Dark-mode preference.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::session::SessionManager;

#[derive(Debug, Clone)]
pub struct ThemeViewModel {
    session: SessionManager,
    is_dark_mode: Arc<AtomicBool>,
}

impl ThemeViewModel {
    /// Load the persisted preference.
    pub async fn new(session: SessionManager) -> Self {
        let is_dark_mode = session.is_dark_mode().await;
        Self {
            session,
            is_dark_mode: Arc::new(AtomicBool::new(is_dark_mode)),
        }
    }

    pub fn is_dark_mode(&self) -> bool {
        self.is_dark_mode.load(Ordering::SeqCst)
    }

    pub async fn set_theme(&self, is_dark_mode: bool) -> Result<()> {
        self.session.save_theme(is_dark_mode).await?;
        self.is_dark_mode.store(is_dark_mode, Ordering::SeqCst);
        tracing::debug!(is_dark_mode, "theme saved");
        Ok(())
    }
}
