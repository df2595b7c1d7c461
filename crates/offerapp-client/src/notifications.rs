//! Push message handling.
//!
//! Delivery is outside this crate. Incoming data payloads become a
//! [`LocalNotification`] handed to a [`Notifier`]; new device tokens are
//! registered for the signed-in user.

use std::collections::HashMap;
use std::sync::Arc;

use offerapp_shared::constants::{
    DEFAULT_NOTIFICATION_BODY, DEFAULT_NOTIFICATION_TITLE, NOTIFICATION_CHANNEL_ID,
    NOTIFICATION_CHANNEL_NAME,
};
use offerapp_shared::UserId;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNotification {
    pub channel_id: String,
    pub channel_name: String,
    pub title: String,
    pub body: String,
}

impl LocalNotification {
    /// Build from a push data payload. Missing keys use the defaults, so an
    /// empty payload still produces a notification.
    pub fn from_data(data: &HashMap<String, String>) -> Self {
        Self {
            channel_id: NOTIFICATION_CHANNEL_ID.to_string(),
            channel_name: NOTIFICATION_CHANNEL_NAME.to_string(),
            title: data
                .get("title")
                .cloned()
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string()),
            body: data
                .get("body")
                .cloned()
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_BODY.to_string()),
        }
    }
}

/// Platform surface that actually shows notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &LocalNotification);
}

/// Default notifier: logs instead of drawing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: &LocalNotification) {
        tracing::info!(channel = %n.channel_id, title = %n.title, body = %n.body, "notification");
    }
}

pub struct PushHandler {
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
}

impl PushHandler {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<dyn Notifier>) -> Self {
        Self { backend, notifier }
    }

    pub fn on_message_received(&self, data: &HashMap<String, String>) -> LocalNotification {
        let notification = LocalNotification::from_data(data);
        self.notifier.notify(&notification);
        notification
    }

    /// Store a refreshed device token. Without a signed-in user the token is
    /// only logged.
    pub async fn on_new_token(&self, user: Option<UserId>, token: &str) -> Result<()> {
        tracing::debug!(token, "new push token");
        let Some(uid) = user else {
            return Ok(());
        };
        self.backend.register_push_token(uid, token).await?;
        tracing::info!(%uid, "push token registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::test_support::store_backend;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<LocalNotification>>);

    impl Notifier for Recorder {
        fn notify(&self, n: &LocalNotification) {
            self.0.lock().unwrap().push(n.clone());
        }
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let n = LocalNotification::from_data(&HashMap::new());
        assert_eq!(n.title, "Nuevo Post");
        assert_eq!(n.body, "Alguien que sigues ha publicado una oferta.");
        assert_eq!(n.channel_id, "post_notifications");
        assert_eq!(n.channel_name, "Notificaciones de Posts");
    }

    #[tokio::test]
    async fn messages_reach_the_notifier_and_tokens_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, store) = store_backend(&dir).await;
        let ana = backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();

        let recorder = Arc::new(Recorder::default());
        let handler = PushHandler::new(backend.clone(), recorder.clone());

        let data = HashMap::from([("title".to_string(), "Oferta de Ana".to_string())]);
        handler.on_message_received(&data);
        let shown = recorder.0.lock().unwrap().clone();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Oferta de Ana");
        assert_eq!(shown[0].body, DEFAULT_NOTIFICATION_BODY);

        handler.on_new_token(None, "tok-0").await.unwrap();
        handler.on_new_token(Some(ana.uid), "tok-1").await.unwrap();
        let stored = store.lock().unwrap().push_token(ana.uid).unwrap();
        assert_eq!(stored.as_deref(), Some("tok-1"));
    }
}
