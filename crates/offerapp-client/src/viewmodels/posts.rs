//! Post lifecycle and comments.

use offerapp_shared::{Comment, NewPost, Post, PostDetails, PostId, PostStatus};

use super::main::MainViewModel;
use crate::error::{ClientError, Result};

impl MainViewModel {
    /// Publish a post with its image. The new post goes to the top of the
    /// fetched list when it passes the current category filter.
    pub async fn add_post(&self, post: NewPost, image: Vec<u8>) -> Result<Post> {
        let post = match post.validated() {
            Ok(post) => post,
            Err(e) => return self.fail("add_post", e),
        };
        let uid = self.lock()?.user.uid;

        let created = match self.backend.create_post(uid, post, image).await {
            Ok(created) => created,
            Err(e) => return self.fail("add_post", e),
        };

        let mut state = self.lock()?;
        if state.query.category.matches(created.category)
            && state.query.status.matches(created.status)
            && state.index_of(created.id).is_none()
        {
            state.all_posts.insert(0, created.clone());
            state.apply_filters();
        }
        tracing::info!(post = %created.id, "post published");
        Ok(created)
    }

    pub async fn update_post_details(&self, post_id: PostId, details: PostDetails) -> Result<Post> {
        self.ensure_own_post(post_id)?;
        match self.backend.update_post_details(post_id, details).await {
            Ok(post) => {
                self.replace_local(&post)?;
                Ok(post)
            }
            Err(e) => self.fail("update_post_details", e),
        }
    }

    pub async fn update_post_status(&self, post_id: PostId, status: PostStatus) -> Result<()> {
        self.ensure_own_post(post_id)?;
        if let Err(e) = self.backend.update_post_status(post_id, status).await {
            return self.fail("update_post_status", e);
        }
        let mut state = self.lock()?;
        if let Some(idx) = state.index_of(post_id) {
            state.all_posts[idx].status = status;
            state.apply_filters();
        }
        Ok(())
    }

    /// Delete a post (and, on the backend, its comments) and forget it locally.
    pub async fn delete_post(&self, post_id: PostId) -> Result<()> {
        self.ensure_own_post(post_id)?;
        if let Err(e) = self.backend.delete_post(post_id).await {
            return self.fail("delete_post", e);
        }
        let mut state = self.lock()?;
        state.all_posts.retain(|p| p.id != post_id);
        state.user.favorites.remove(&post_id);
        if state.selected_post_id == Some(post_id) {
            state.selected_post_id = None;
            state.comments.clear();
        }
        state.apply_filters();
        tracing::info!(post = %post_id, "post removed from feed");
        Ok(())
    }

    /// Select a post for the detail screen and load its comments.
    pub async fn select_post(&self, post_id: Option<PostId>) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.selected_post_id = post_id;
            state.comments.clear();
        }
        match post_id {
            Some(id) => self.load_comments(id).await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Comments for `post_id`, newest first.
    pub async fn load_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let comments = match self.backend.comments_for_post(post_id).await {
            Ok(comments) => comments,
            Err(e) => return self.fail("load_comments", e),
        };
        let mut state = self.lock()?;
        // a different post may have been selected meanwhile
        if state.selected_post_id.map_or(true, |id| id == post_id) {
            state.comments = comments.clone();
        }
        Ok(comments)
    }

    pub async fn add_comment(&self, post_id: PostId, text: &str) -> Result<Comment> {
        let uid = self.lock()?.user.uid;
        let comment = match self.backend.add_comment(post_id, uid, text).await {
            Ok(comment) => comment,
            Err(e) => return self.fail("add_comment", e),
        };
        let mut state = self.lock()?;
        if state.selected_post_id == Some(post_id) {
            state.comments.insert(0, comment.clone());
        }
        state.my_comments.insert(0, comment.clone());
        Ok(comment)
    }

    fn ensure_own_post(&self, post_id: PostId) -> Result<()> {
        let check = {
            let state = self.lock()?;
            match state.post(post_id) {
                Some(post) if post.is_authored_by(state.user.uid) => Ok(()),
                Some(_) => Err(ClientError::InvalidInput(
                    "Solo el autor puede modificar esta oferta.".into(),
                )),
                None => Err(ClientError::PostNotLoaded(post_id)),
            }
        };
        match check {
            Ok(()) => Ok(()),
            Err(e) => self.fail("ensure_own_post", e),
        }
    }

    fn replace_local(&self, post: &Post) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(idx) = state.index_of(post.id) {
            state.all_posts[idx] = post.clone();
            state.apply_filters();
        }
        Ok(())
    }
}
