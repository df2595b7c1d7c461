//! State behind the feed, post detail and profile screens.
//!
//! [`MainViewModel`] is a cheap-to-clone handle over `Arc<Mutex<MainState>>`.
//! Operations are split across `feed`, `votes`, `posts` and `profile`; every
//! one of them takes the lock only for short synchronous sections and never
//! across a backend call.

use std::sync::{Arc, Mutex, MutexGuard};

use offerapp_shared::feed::{self, LocalFilter};
use offerapp_shared::{Comment, FeedQuery, PageCursor, Post, PostId, User, UserId};

use crate::backend::Backend;
use crate::error::{ClientError, Result};

/// Snapshot-able view-model state.
#[derive(Debug, Clone)]
pub struct MainState {
    /// The signed-in user.
    pub user: User,

    /// Every post fetched so far, in feed order.
    pub all_posts: Vec<Post>,

    /// `all_posts` after the tab and search filters.
    pub posts: Vec<Post>,

    /// Server-side part of the feed filters.
    pub query: FeedQuery,

    /// Client-side part of the feed filters.
    pub filter: LocalFilter,

    pub cursor: Option<PageCursor>,
    pub is_loading: bool,
    pub all_loaded: bool,

    /// Bumped on every reset so a late page from the old query is dropped.
    pub(crate) generation: u64,

    pub selected_post_id: Option<PostId>,
    pub comments: Vec<Comment>,

    pub profile_user: Option<User>,
    pub profile_user_comments: Vec<Comment>,
    pub my_comments: Vec<Comment>,

    /// Display string of the last failed action.
    pub last_error: Option<String>,
}

impl MainState {
    fn new(user: User) -> Self {
        Self {
            user,
            all_posts: Vec::new(),
            posts: Vec::new(),
            query: FeedQuery::default(),
            filter: LocalFilter::default(),
            cursor: None,
            is_loading: false,
            all_loaded: false,
            generation: 0,
            selected_post_id: None,
            comments: Vec::new(),
            profile_user: None,
            profile_user_comments: Vec::new(),
            my_comments: Vec::new(),
            last_error: None,
        }
    }

    pub(crate) fn apply_filters(&mut self) {
        self.posts = feed::apply_filters(&self.all_posts, &self.filter, &self.user.following);
    }

    pub(crate) fn index_of(&self, id: PostId) -> Option<usize> {
        self.all_posts.iter().position(|p| p.id == id)
    }

    /// Drop the fetched list and cursor; the next fetch starts over.
    pub(crate) fn reset_feed(&mut self) {
        self.generation += 1;
        self.all_posts.clear();
        self.posts.clear();
        self.cursor = None;
        self.all_loaded = false;
        self.is_loading = false;
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.all_posts.iter().find(|p| p.id == id)
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.selected_post_id.and_then(|id| self.post(id))
    }

    pub fn my_posts(&self) -> Vec<Post> {
        self.posts_by_user(self.user.uid)
    }

    pub fn favorite_posts(&self) -> Vec<Post> {
        self.all_posts
            .iter()
            .filter(|p| self.user.is_favorite(p.id))
            .cloned()
            .collect()
    }

    pub fn posts_by_user(&self, uid: UserId) -> Vec<Post> {
        self.all_posts
            .iter()
            .filter(|p| p.is_authored_by(uid))
            .cloned()
            .collect()
    }
}

#[derive(Clone)]
pub struct MainViewModel {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) page_size: u32,
    pub(crate) state: Arc<Mutex<MainState>>,
}

impl MainViewModel {
    pub fn new(backend: Arc<dyn Backend>, user: User, page_size: u32) -> Self {
        Self {
            backend,
            page_size: page_size.max(1),
            state: Arc::new(Mutex::new(MainState::new(user))),
        }
    }

    /// Screen-entry work: sweep stale posts, load the first page, refresh the
    /// user and their comments. Each step logs its own failure and the rest
    /// still run.
    pub async fn start(&self) {
        match self.backend.expire_old_posts().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(expired = n, "expired old posts"),
            Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
        }
        if let Err(e) = self.refresh_posts().await {
            tracing::warn!(error = %e, "initial feed load failed");
        }
        if let Err(e) = self.refresh_current_user().await {
            tracing::warn!(error = %e, "user refresh failed");
        }
        if let Err(e) = self.load_my_comments().await {
            tracing::warn!(error = %e, "loading own comments failed");
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> Result<MainState> {
        Ok(self.lock()?.clone())
    }

    pub fn user(&self) -> Result<User> {
        Ok(self.lock()?.user.clone())
    }

    pub fn posts(&self) -> Result<Vec<Post>> {
        Ok(self.lock()?.posts.clone())
    }

    pub fn get_post_by_id(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self.lock()?.post(id).cloned())
    }

    pub fn selected_post(&self) -> Result<Option<Post>> {
        Ok(self.lock()?.selected_post().cloned())
    }

    pub fn my_posts(&self) -> Result<Vec<Post>> {
        Ok(self.lock()?.my_posts())
    }

    pub fn favorite_posts(&self) -> Result<Vec<Post>> {
        Ok(self.lock()?.favorite_posts())
    }

    pub fn posts_by_user(&self, uid: UserId) -> Result<Vec<Post>> {
        Ok(self.lock()?.posts_by_user(uid))
    }

    pub fn last_error(&self) -> Result<Option<String>> {
        Ok(self.lock()?.last_error.clone())
    }

    pub fn clear_error(&self) -> Result<()> {
        self.lock()?.last_error = None;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, MainState>> {
        Ok(self.state.lock()?)
    }

    /// Log `err`, keep its display string for the UI and return it.
    pub(crate) fn fail<T>(&self, action: &str, err: impl Into<ClientError>) -> Result<T> {
        let err = err.into();
        tracing::warn!(action, error = %err, "action failed");
        if let Ok(mut state) = self.state.lock() {
            state.last_error = Some(err.user_message());
        }
        Err(err)
    }
}
