//! Backends for view-model tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use offerapp_shared::{
    Category, Comment, FeedQuery, NewPost, PageCursor, Post, PostDetails, PostId, PostStatus, User,
    UserId, VoteValue,
};
use offerapp_store::{Database, ImageStore, Page};

use crate::backend::{Backend, BackendError, BackendResult, StoreBackend};

pub(crate) async fn store_backend(
    dir: &tempfile::TempDir,
) -> (Arc<dyn Backend>, Arc<Mutex<Database>>) {
    let images = ImageStore::new(dir.path().join("images"), "file:///imgs", 1 << 20)
        .await
        .unwrap();
    let backend = StoreBackend::new(Database::open_in_memory().unwrap(), images);
    let db = backend.database();
    (Arc::new(backend), db)
}

pub(crate) fn new_post(description: &str, category: Category, price: f64) -> NewPost {
    NewPost {
        details: PostDetails {
            description: description.into(),
            price,
            discount_price: price / 2.0,
            category,
            store: "Tienda".into(),
        },
        location: "Centro".into(),
        latitude: -34.6,
        longitude: -58.4,
    }
}

/// Wraps a real backend and injects failures or suspension points.
pub(crate) struct FlakyBackend {
    inner: Arc<dyn Backend>,
    pub fail_votes: AtomicBool,
    pub fail_favorites: AtomicBool,
    pub fail_fetches: AtomicBool,
    /// `yield_now` calls before each fetch returns.
    pub fetch_yields: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FlakyBackend {
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self {
            inner,
            fail_votes: AtomicBool::new(false),
            fail_favorites: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            fetch_yields: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    fn injected(flag: &AtomicBool) -> BackendResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FlakyBackend {
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> BackendResult<User> {
        self.inner.sign_up(email, password, username).await
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> BackendResult<User> {
        self.inner.sign_in(identifier, password).await
    }

    async fn send_password_reset(&self, email: &str) -> BackendResult<()> {
        self.inner.send_password_reset(email).await
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> BackendResult<()> {
        self.inner.confirm_password_reset(token, new_password).await
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.inner.sign_out().await
    }

    async fn current_user_id(&self) -> BackendResult<Option<UserId>> {
        self.inner.current_user_id().await
    }

    async fn get_user(&self, uid: UserId) -> BackendResult<Option<User>> {
        self.inner.get_user(uid).await
    }

    async fn get_users(&self, uids: &[UserId]) -> BackendResult<Vec<User>> {
        self.inner.get_users(uids).await
    }

    async fn follow_user(&self, follower: UserId, followee: UserId) -> BackendResult<()> {
        self.inner.follow_user(follower, followee).await
    }

    async fn unfollow_user(&self, follower: UserId, followee: UserId) -> BackendResult<()> {
        self.inner.unfollow_user(follower, followee).await
    }

    async fn add_favorite(&self, uid: UserId, post: PostId) -> BackendResult<()> {
        tokio::task::yield_now().await;
        Self::injected(&self.fail_favorites)?;
        self.inner.add_favorite(uid, post).await
    }

    async fn remove_favorite(&self, uid: UserId, post: PostId) -> BackendResult<()> {
        tokio::task::yield_now().await;
        Self::injected(&self.fail_favorites)?;
        self.inner.remove_favorite(uid, post).await
    }

    async fn update_profile_image(&self, uid: UserId, image: Vec<u8>) -> BackendResult<String> {
        self.inner.update_profile_image(uid, image).await
    }

    async fn register_push_token(&self, uid: UserId, token: &str) -> BackendResult<()> {
        self.inner.register_push_token(uid, token).await
    }

    async fn fetch_posts(
        &self,
        query: FeedQuery,
        cursor: Option<PageCursor>,
        limit: u32,
    ) -> BackendResult<Page> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        for _ in 0..self.fetch_yields.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        Self::injected(&self.fail_fetches)?;
        self.inner.fetch_posts(query, cursor, limit).await
    }

    async fn create_post(
        &self,
        author: UserId,
        post: NewPost,
        image: Vec<u8>,
    ) -> BackendResult<Post> {
        self.inner.create_post(author, post, image).await
    }

    async fn update_post_details(&self, id: PostId, details: PostDetails) -> BackendResult<Post> {
        self.inner.update_post_details(id, details).await
    }

    async fn update_post_status(&self, id: PostId, status: PostStatus) -> BackendResult<()> {
        self.inner.update_post_status(id, status).await
    }

    async fn delete_post(&self, id: PostId) -> BackendResult<()> {
        self.inner.delete_post(id).await
    }

    async fn expire_old_posts(&self) -> BackendResult<usize> {
        self.inner.expire_old_posts().await
    }

    async fn update_post_score(
        &self,
        post: PostId,
        user: UserId,
        value: VoteValue,
    ) -> BackendResult<Post> {
        tokio::task::yield_now().await;
        Self::injected(&self.fail_votes)?;
        self.inner.update_post_score(post, user, value).await
    }

    async fn add_comment(
        &self,
        post: PostId,
        author: UserId,
        text: &str,
    ) -> BackendResult<Comment> {
        self.inner.add_comment(post, author, text).await
    }

    async fn comments_for_post(&self, post: PostId) -> BackendResult<Vec<Comment>> {
        self.inner.comments_for_post(post).await
    }

    async fn comments_by_user(&self, author: UserId) -> BackendResult<Vec<Comment>> {
        self.inner.comments_by_user(author).await
    }
}
