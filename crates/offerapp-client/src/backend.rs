//! The seam between the view-models and the managed backend.
//!
//! [`Backend`] covers auth, the document database, object storage and push
//! token registration. [`StoreBackend`] implements it over the embedded
//! SQLite store and the on-disk image store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use offerapp_shared::{
    AuthErrorCode, Comment, FeedQuery, NewPost, PageCursor, Post, PostDetails, PostId, PostStatus,
    User, UserId, ValidationError, VoteValue,
};
use offerapp_store::{Database, ImageStore, Page, StoreError};
use thiserror::Error;

/// Errors returned by a [`Backend`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Auth error: {0}")]
    Auth(AuthErrorCode),

    #[error("Record not found")]
    NotFound,

    #[error("Post is not active")]
    PostNotActive,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Spanish display string for the UI.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Auth(code) => code.message().to_string(),
            BackendError::NotFound => "El elemento ya no existe.".into(),
            BackendError::PostNotActive => "La oferta está vencida.".into(),
            BackendError::InvalidTransition { .. } => {
                "Una oferta vencida no puede volver a activarse.".into()
            }
            BackendError::Validation(e) => validation_message(e).into(),
            BackendError::InvalidImage(_) => "La imagen no es válida o es demasiado grande.".into(),
            BackendError::InvalidCursor(_) | BackendError::Unavailable(_) => {
                "No se pudo completar la operación. Intenta nuevamente.".into()
            }
        }
    }
}

pub(crate) fn validation_message(e: &ValidationError) -> &'static str {
    match e {
        ValidationError::MissingCategory => "Debes seleccionar una categoría.",
        ValidationError::InvalidPrice(_) => "El precio no es válido.",
        ValidationError::DiscountNotLower { .. } => {
            "El precio con descuento debe ser menor al precio original."
        }
        ValidationError::InvalidCoordinates { .. } => "La ubicación no es válida.",
        ValidationError::EmptyComment => "El comentario no puede estar vacío.",
        ValidationError::UnknownCategory(_)
        | ValidationError::UnknownStatus(_)
        | ValidationError::InvalidVoteValue(_) => "Valor no válido.",
    }
}

impl From<StoreError> for BackendError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Auth(code) => BackendError::Auth(code),
            StoreError::NotFound => BackendError::NotFound,
            StoreError::PostNotActive => BackendError::PostNotActive,
            StoreError::InvalidTransition { from, to } => {
                BackendError::InvalidTransition { from, to }
            }
            StoreError::Validation(e) => BackendError::Validation(e),
            StoreError::InvalidCursor(c) => BackendError::InvalidCursor(c),
            e @ (StoreError::ImageTooLarge { .. } | StoreError::EmptyImage) => {
                BackendError::InvalidImage(e.to_string())
            }
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[async_trait]
pub trait Backend: Send + Sync {
    // -- auth --

    async fn sign_up(&self, email: &str, password: &str, username: &str) -> BackendResult<User>;

    /// `identifier` is an email or a username.
    async fn sign_in(&self, identifier: &str, password: &str) -> BackendResult<User>;

    async fn send_password_reset(&self, email: &str) -> BackendResult<()>;

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> BackendResult<()>;

    async fn sign_out(&self) -> BackendResult<()>;

    async fn current_user_id(&self) -> BackendResult<Option<UserId>>;

    // -- users --

    async fn get_user(&self, uid: UserId) -> BackendResult<Option<User>>;

    async fn get_users(&self, uids: &[UserId]) -> BackendResult<Vec<User>>;

    async fn follow_user(&self, follower: UserId, followee: UserId) -> BackendResult<()>;

    async fn unfollow_user(&self, follower: UserId, followee: UserId) -> BackendResult<()>;

    async fn add_favorite(&self, uid: UserId, post: PostId) -> BackendResult<()>;

    async fn remove_favorite(&self, uid: UserId, post: PostId) -> BackendResult<()>;

    /// Upload the image and point the profile at it. Returns the new URL.
    async fn update_profile_image(&self, uid: UserId, image: Vec<u8>) -> BackendResult<String>;

    async fn register_push_token(&self, uid: UserId, token: &str) -> BackendResult<()>;

    // -- posts --

    async fn fetch_posts(
        &self,
        query: FeedQuery,
        cursor: Option<PageCursor>,
        limit: u32,
    ) -> BackendResult<Page>;

    /// Upload the image, then publish the post with its URL.
    async fn create_post(&self, author: UserId, post: NewPost, image: Vec<u8>)
        -> BackendResult<Post>;

    async fn update_post_details(&self, id: PostId, details: PostDetails) -> BackendResult<Post>;

    async fn update_post_status(&self, id: PostId, status: PostStatus) -> BackendResult<()>;

    async fn delete_post(&self, id: PostId) -> BackendResult<()>;

    /// Age-based sweep. Returns how many posts were expired.
    async fn expire_old_posts(&self) -> BackendResult<usize>;

    /// Transactional vote update. Returns the reconciled post.
    async fn update_post_score(
        &self,
        post: PostId,
        user: UserId,
        value: VoteValue,
    ) -> BackendResult<Post>;

    // -- comments --

    async fn add_comment(&self, post: PostId, author: UserId, text: &str)
        -> BackendResult<Comment>;

    async fn comments_for_post(&self, post: PostId) -> BackendResult<Vec<Comment>>;

    async fn comments_by_user(&self, author: UserId) -> BackendResult<Vec<Comment>>;
}

/// [`Backend`] over the embedded store.
#[derive(Clone)]
pub struct StoreBackend {
    db: Arc<Mutex<Database>>,
    images: ImageStore,
}

impl StoreBackend {
    pub fn new(db: Database, images: ImageStore) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            images,
        }
    }

    /// Shared handle to the underlying store.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&mut Database) -> offerapp_store::Result<T>,
    ) -> BackendResult<T> {
        let mut guard = self
            .db
            .lock()
            .map_err(|e| BackendError::Unavailable(format!("Lock poisoned: {e}")))?;
        f(&mut guard).map_err(BackendError::from)
    }

    async fn discard_image(&self, url: &str) {
        if let Err(e) = self.images.delete(url).await {
            tracing::warn!(url, error = %e, "failed to remove image");
        }
    }
}

#[async_trait]
impl Backend for StoreBackend {
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> BackendResult<User> {
        self.with_db(|db| db.sign_up(email, password, username))
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> BackendResult<User> {
        self.with_db(|db| db.sign_in(identifier, password))
    }

    async fn send_password_reset(&self, email: &str) -> BackendResult<()> {
        let ticket = self.with_db(|db| db.request_password_reset(email))?;
        // stand-in for the mail service
        tracing::info!(email = %ticket.email, expires_at = %ticket.expires_at, "password reset mail queued");
        Ok(())
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> BackendResult<()> {
        self.with_db(|db| db.confirm_password_reset(token, new_password))
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.with_db(|db| db.sign_out())
    }

    async fn current_user_id(&self) -> BackendResult<Option<UserId>> {
        self.with_db(|db| db.current_user_id())
    }

    async fn get_user(&self, uid: UserId) -> BackendResult<Option<User>> {
        match self.with_db(|db| db.get_user(uid)) {
            Ok(user) => Ok(Some(user)),
            Err(BackendError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_users(&self, uids: &[UserId]) -> BackendResult<Vec<User>> {
        self.with_db(|db| db.get_users(uids))
    }

    async fn follow_user(&self, follower: UserId, followee: UserId) -> BackendResult<()> {
        self.with_db(|db| db.follow_user(follower, followee))
    }

    async fn unfollow_user(&self, follower: UserId, followee: UserId) -> BackendResult<()> {
        self.with_db(|db| db.unfollow_user(follower, followee))
    }

    async fn add_favorite(&self, uid: UserId, post: PostId) -> BackendResult<()> {
        self.with_db(|db| db.add_favorite(uid, post))
    }

    async fn remove_favorite(&self, uid: UserId, post: PostId) -> BackendResult<()> {
        self.with_db(|db| db.remove_favorite(uid, post)).map(|_| ())
    }

    async fn update_profile_image(&self, uid: UserId, image: Vec<u8>) -> BackendResult<String> {
        let url = self.images.upload(&image).await?;
        if let Err(e) = self.with_db(|db| db.set_profile_image_url(uid, &url)) {
            self.discard_image(&url).await;
            return Err(e);
        }
        Ok(url)
    }

    async fn register_push_token(&self, uid: UserId, token: &str) -> BackendResult<()> {
        self.with_db(|db| db.set_push_token(uid, token))
    }

    async fn fetch_posts(
        &self,
        query: FeedQuery,
        cursor: Option<PageCursor>,
        limit: u32,
    ) -> BackendResult<Page> {
        self.with_db(|db| db.fetch_posts_page(&query, cursor.as_ref(), limit))
    }

    async fn create_post(
        &self,
        author: UserId,
        post: NewPost,
        image: Vec<u8>,
    ) -> BackendResult<Post> {
        // validate before spending an upload on it
        let post = post.validated()?;
        let url = self.images.upload(&image).await?;
        match self.with_db(|db| db.create_post(author, post, &url)) {
            Ok(post) => Ok(post),
            Err(e) => {
                self.discard_image(&url).await;
                Err(e)
            }
        }
    }

    async fn update_post_details(&self, id: PostId, details: PostDetails) -> BackendResult<Post> {
        self.with_db(|db| db.update_post_details(id, details))
    }

    async fn update_post_status(&self, id: PostId, status: PostStatus) -> BackendResult<()> {
        self.with_db(|db| db.update_post_status(id, status))
    }

    async fn delete_post(&self, id: PostId) -> BackendResult<()> {
        let image_url = self.with_db(|db| {
            let post = db.get_post(id)?;
            db.delete_post(id)?;
            Ok(post.image_url)
        })?;
        self.discard_image(&image_url).await;
        Ok(())
    }

    async fn expire_old_posts(&self) -> BackendResult<usize> {
        self.with_db(|db| db.expire_old_posts(Utc::now()))
    }

    async fn update_post_score(
        &self,
        post: PostId,
        user: UserId,
        value: VoteValue,
    ) -> BackendResult<Post> {
        self.with_db(|db| db.apply_vote(post, user, value))
    }

    async fn add_comment(
        &self,
        post: PostId,
        author: UserId,
        text: &str,
    ) -> BackendResult<Comment> {
        self.with_db(|db| db.add_comment(post, author, text))
    }

    async fn comments_for_post(&self, post: PostId) -> BackendResult<Vec<Comment>> {
        self.with_db(|db| db.comments_for_post(post))
    }

    async fn comments_by_user(&self, author: UserId) -> BackendResult<Vec<Comment>> {
        self.with_db(|db| db.comments_by_user(author))
    }
}

#[cfg(test)]
mod tests {
    use offerapp_shared::Category;

    use super::*;

    fn new_post(description: &str) -> NewPost {
        NewPost {
            details: PostDetails {
                description: description.into(),
                price: 100.0,
                discount_price: 80.0,
                category: Category::Technology,
                store: "Tienda".into(),
            },
            location: "Centro".into(),
            latitude: -34.6,
            longitude: -58.4,
        }
    }

    async fn backend(dir: &tempfile::TempDir) -> StoreBackend {
        let images = ImageStore::new(dir.path().join("images"), "file:///imgs", 1024)
            .await
            .unwrap();
        StoreBackend::new(Database::open_in_memory().unwrap(), images)
    }

    #[tokio::test]
    async fn create_post_uploads_then_delete_removes_image() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let ana = backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();

        let post = backend
            .create_post(ana.uid, new_post("Monitor"), b"img".to_vec())
            .await
            .unwrap();
        assert!(post.image_url.starts_with("file:///imgs/"));
        assert_eq!(backend.images.read(&post.image_url).await.unwrap(), b"img");

        backend.delete_post(post.id).await.unwrap();
        assert!(backend.images.read(&post.image_url).await.is_err());
        assert_eq!(backend.delete_post(post.id).await, Err(BackendError::NotFound));
    }

    #[tokio::test]
    async fn invalid_post_is_rejected_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let ana = backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();

        let mut post = new_post("Monitor");
        post.details.discount_price = 150.0;
        let err = backend
            .create_post(ana.uid, post, b"img".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Validation(ValidationError::DiscountNotLower { .. })));

        let mut entries = tokio::fs::read_dir(dir.path().join("images")).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_user_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        assert_eq!(backend.get_user(UserId::new()).await, Ok(None));
    }

    #[tokio::test]
    async fn profile_image_upload_updates_user() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let ana = backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();

        let url = backend.update_profile_image(ana.uid, b"face".to_vec()).await.unwrap();
        let user = backend.get_user(ana.uid).await.unwrap().unwrap();
        assert_eq!(user.profile_image_url.as_deref(), Some(url.as_str()));

        assert!(matches!(
            backend.update_profile_image(ana.uid, Vec::new()).await,
            Err(BackendError::InvalidImage(_))
        ));
    }

    #[derive(Clone, Default)]
    struct LogBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn reset_token_never_reaches_the_logs() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        backend.sign_up("ana@example.com", "secreto1", "ana").await.unwrap();

        let logs = LogBuf::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        backend.send_password_reset("ana@example.com").await.unwrap();
        drop(guard);

        let token: String = backend
            .database()
            .lock()
            .unwrap()
            .conn()
            .query_row("SELECT token FROM password_resets", [], |row| row.get(0))
            .unwrap();
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("password reset mail queued"));
        assert!(!output.contains(&token));
    }

    #[test]
    fn auth_errors_map_to_table_messages() {
        let err = BackendError::from(StoreError::Auth(AuthErrorCode::WrongPassword));
        assert_eq!(
            err.user_message(),
            "El usuario y/o la contraseña no son correctos"
        );
        let err = BackendError::from(StoreError::Auth(AuthErrorCode::NotSignedIn));
        assert_eq!(
            err.user_message(),
            "Error al procesar la autenticación. Intenta nuevamente."
        );
    }
}
