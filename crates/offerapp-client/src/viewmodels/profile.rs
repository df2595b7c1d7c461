//! Profiles, the follow graph and the signed-in user's own data.

use offerapp_shared::{Comment, User, UserId};

use super::main::MainViewModel;
use crate::error::Result;

impl MainViewModel {
    /// Re-read the signed-in user and re-apply filters, since the following
    /// set drives the "Siguiendo" tab.
    pub async fn refresh_current_user(&self) -> Result<()> {
        let uid = self.lock()?.user.uid;
        match self.backend.get_user(uid).await {
            Ok(Some(user)) => {
                let mut state = self.lock()?;
                state.user = user;
                state.apply_filters();
                Ok(())
            }
            Ok(None) => {
                tracing::warn!(%uid, "signed-in user no longer exists");
                Ok(())
            }
            Err(e) => self.fail("refresh_current_user", e),
        }
    }

    pub async fn load_my_comments(&self) -> Result<()> {
        let uid = self.lock()?.user.uid;
        let comments = self.comments_by_user(uid).await;
        self.lock()?.my_comments = comments;
        Ok(())
    }

    /// Everything `uid` has commented. Failures read as an empty list.
    pub async fn comments_by_user(&self, uid: UserId) -> Vec<Comment> {
        match self.backend.comments_by_user(uid).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::error!(%uid, error = %e, "failed to load comments by user");
                Vec::new()
            }
        }
    }

    /// Load a profile screen. The signed-in user's own profile comes from
    /// local state; anyone else is fetched together with their comments.
    pub async fn load_user_profile(&self, uid: UserId) -> Result<Option<User>> {
        let me = {
            let mut state = self.lock()?;
            state.profile_user = None;
            state.profile_user_comments.clear();
            state.user.clone()
        };

        if uid == me.uid {
            self.lock()?.profile_user = Some(me.clone());
            return Ok(Some(me));
        }

        let user = match self.backend.get_user(uid).await {
            Ok(user) => user,
            Err(e) => return self.fail("load_user_profile", e),
        };
        let Some(user) = user else {
            tracing::warn!(%uid, "profile not found, no comments to load");
            return Ok(None);
        };

        let comments = self.comments_by_user(uid).await;
        let mut state = self.lock()?;
        state.profile_user = Some(user.clone());
        state.profile_user_comments = comments;
        Ok(Some(user))
    }

    pub async fn follow_user(&self, followee: UserId) -> Result<()> {
        let uid = self.lock()?.user.uid;
        if let Err(e) = self.backend.follow_user(uid, followee).await {
            return self.fail("follow_user", e);
        }
        self.after_follow_change(followee).await
    }

    pub async fn unfollow_user(&self, followee: UserId) -> Result<()> {
        let uid = self.lock()?.user.uid;
        if let Err(e) = self.backend.unfollow_user(uid, followee).await {
            return self.fail("unfollow_user", e);
        }
        self.after_follow_change(followee).await
    }

    async fn after_follow_change(&self, followee: UserId) -> Result<()> {
        self.refresh_current_user().await?;
        match self.backend.get_user(followee).await {
            Ok(user) => self.lock()?.profile_user = user,
            Err(e) => tracing::warn!(%followee, error = %e, "profile refresh after follow change failed"),
        }
        Ok(())
    }

    pub async fn get_user(&self, uid: UserId) -> Result<Option<User>> {
        match self.backend.get_user(uid).await {
            Ok(user) => Ok(user),
            Err(e) => self.fail("get_user", e),
        }
    }

    pub async fn get_users(&self, uids: &[UserId]) -> Result<Vec<User>> {
        match self.backend.get_users(uids).await {
            Ok(users) => Ok(users),
            Err(e) => self.fail("get_users", e),
        }
    }

    /// Upload a new profile photo and refresh the signed-in user.
    pub async fn update_profile_image(&self, image: Vec<u8>) -> Result<String> {
        let uid = self.lock()?.user.uid;
        let url = match self.backend.update_profile_image(uid, image).await {
            Ok(url) => url,
            Err(e) => return self.fail("update_profile_image", e),
        };
        self.refresh_current_user().await?;
        Ok(url)
    }
}
