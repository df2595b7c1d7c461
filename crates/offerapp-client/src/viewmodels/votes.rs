//! Optimistic vote and favourite updates.
//!
//! Both apply the change to local state first, then call the backend. On
//! success the vote path adopts the post the backend returned; on failure
//! both restore what was there before.

use offerapp_shared::{Post, PostId, VoteValue};

use super::main::MainViewModel;
use crate::error::{ClientError, Result};

impl MainViewModel {
    /// Vote on a loaded post. Returns the post as reconciled by the backend.
    pub async fn update_post_score(&self, post_id: PostId, value: VoteValue) -> Result<Post> {
        let prepared = {
            let mut state = self.lock()?;
            let uid = state.user.uid;
            match state.index_of(post_id) {
                None => Err(ClientError::PostNotLoaded(post_id)),
                Some(idx) if state.all_posts[idx].is_authored_by(uid) => Err(ClientError::OwnPost),
                Some(idx) => {
                    let original = state.all_posts[idx].clone();
                    let mut updated = original.clone();
                    match updated.cast_vote(uid, value) {
                        Ok(change) => {
                            tracing::debug!(post = %post_id, ?change, score = updated.score(), "optimistic vote");
                            state.all_posts[idx] = updated;
                            state.apply_filters();
                            Ok((original, uid, state.generation))
                        }
                        Err(e) => Err(e.into()),
                    }
                }
            }
        };
        let (original, uid, generation) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return self.fail("update_post_score", e),
        };

        match self.backend.update_post_score(post_id, uid, value).await {
            Ok(post) => {
                let mut state = self.lock()?;
                if let Some(idx) = state.index_of(post_id) {
                    state.all_posts[idx] = post.clone();
                    state.apply_filters();
                }
                tracing::debug!(post = %post_id, score = post.score(), status = %post.status, "vote reconciled");
                Ok(post)
            }
            Err(e) => {
                {
                    let mut state = self.lock()?;
                    // a refresh meanwhile already replaced the optimistic copy
                    if state.generation == generation {
                        if let Some(idx) = state.index_of(post_id) {
                            state.all_posts[idx] = original;
                            state.apply_filters();
                        }
                    }
                }
                tracing::warn!(post = %post_id, "vote failed, local copy rolled back");
                self.fail("update_post_score", e)
            }
        }
    }

    /// Flip the favourite mark on `post_id`. Returns the new value.
    pub async fn toggle_favorite(&self, post_id: PostId) -> Result<bool> {
        let (uid, was_favorite) = {
            let mut state = self.lock()?;
            let was_favorite = state.user.favorites.contains(&post_id);
            if was_favorite {
                state.user.favorites.remove(&post_id);
            } else {
                state.user.favorites.insert(post_id);
            }
            (state.user.uid, was_favorite)
        };

        let result = if was_favorite {
            self.backend.remove_favorite(uid, post_id).await
        } else {
            self.backend.add_favorite(uid, post_id).await
        };

        match result {
            Ok(()) => Ok(!was_favorite),
            Err(e) => {
                {
                    let mut state = self.lock()?;
                    if was_favorite {
                        state.user.favorites.insert(post_id);
                    } else {
                        state.user.favorites.remove(&post_id);
                    }
                }
                tracing::warn!(post = %post_id, "favourite toggle failed, rolled back");
                self.fail("toggle_favorite", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use offerapp_shared::{Category, PostStatus, User};

    use super::*;
    use crate::backend::Backend;
    use crate::test_support::{new_post, store_backend, FlakyBackend};

    struct Fixture {
        flaky: Arc<FlakyBackend>,
        author: User,
        voter: User,
        post: PostId,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let (inner, _) = store_backend(&dir).await;
        let author = inner.sign_up("autor@example.com", "secreto1", "autor").await.unwrap();
        let voter = inner.sign_up("voto@example.com", "secreto1", "voto").await.unwrap();
        let post = inner
            .create_post(author.uid, new_post("Zapatillas", Category::Sports, 100.0), b"i".to_vec())
            .await
            .unwrap()
            .id;
        Fixture {
            flaky: Arc::new(FlakyBackend::new(inner)),
            author,
            voter,
            post,
            _dir: dir,
        }
    }

    async fn loaded_vm(f: &Fixture, user: &User) -> MainViewModel {
        let vm = MainViewModel::new(f.flaky.clone(), user.clone(), 10);
        vm.refresh_posts().await.unwrap();
        vm
    }

    #[tokio::test]
    async fn vote_reconciles_with_backend() {
        let f = fixture().await;
        let vm = loaded_vm(&f, &f.voter).await;

        let post = vm.update_post_score(f.post, VoteValue::Up).await.unwrap();
        assert_eq!(post.score(), 1);
        assert_eq!(vm.get_post_by_id(f.post).unwrap().unwrap().score(), 1);

        // same value again withdraws
        let post = vm.update_post_score(f.post, VoteValue::Up).await.unwrap();
        assert_eq!(post.score(), 0);
        assert_eq!(post.user_vote(f.voter.uid), None);
    }

    #[tokio::test]
    async fn optimistic_vote_is_visible_then_rolled_back() {
        let f = fixture().await;
        f.flaky.fail_votes.store(true, Ordering::SeqCst);
        let vm = loaded_vm(&f, &f.voter).await;
        let before = vm.get_post_by_id(f.post).unwrap().unwrap();

        let observer = vm.clone();
        let post = f.post;
        let (result, seen) = tokio::join!(vm.update_post_score(post, VoteValue::Down), async move {
            // runs while the backend call is suspended
            observer.get_post_by_id(post).unwrap().unwrap().score()
        });

        assert_eq!(seen, -1);
        assert!(result.is_err());
        assert_eq!(vm.get_post_by_id(f.post).unwrap().unwrap(), before);
        assert!(vm.last_error().unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_vote_keeps_copy_from_a_refresh_in_flight() {
        let f = fixture().await;
        let vm = loaded_vm(&f, &f.voter).await;

        // someone else votes after our page was loaded
        let third = f.flaky.sign_up("otro@example.com", "secreto1", "otro").await.unwrap();
        f.flaky.update_post_score(f.post, third.uid, VoteValue::Up).await.unwrap();
        f.flaky.fail_votes.store(true, Ordering::SeqCst);

        let refresher = vm.clone();
        let (result, refreshed) = tokio::join!(
            vm.update_post_score(f.post, VoteValue::Down),
            refresher.refresh_posts()
        );

        assert!(result.is_err());
        refreshed.unwrap();
        let post = vm.get_post_by_id(f.post).unwrap().unwrap();
        assert_eq!(post.score(), 1);
        assert_eq!(post.user_vote(third.uid), Some(VoteValue::Up));
    }

    #[tokio::test]
    async fn own_post_and_expired_post_are_refused_locally() {
        let f = fixture().await;
        let vm = loaded_vm(&f, &f.author).await;
        assert_eq!(
            vm.update_post_score(f.post, VoteValue::Up).await,
            Err(ClientError::OwnPost)
        );

        f.flaky.update_post_status(f.post, PostStatus::Expired).await.unwrap();
        let vm = loaded_vm(&f, &f.voter).await;
        assert_eq!(
            vm.update_post_score(f.post, VoteValue::Up).await,
            Err(ClientError::PostNotActive)
        );
        assert!(matches!(
            vm.update_post_score(PostId::new(), VoteValue::Up).await,
            Err(ClientError::PostNotLoaded(_))
        ));
    }

    #[tokio::test]
    async fn favourite_toggle_rolls_back_on_failure() {
        let f = fixture().await;
        let vm = loaded_vm(&f, &f.voter).await;

        assert!(vm.toggle_favorite(f.post).await.unwrap());
        assert_eq!(vm.favorite_posts().unwrap().len(), 1);
        let stored = f.flaky.get_user(f.voter.uid).await.unwrap().unwrap();
        assert!(stored.is_favorite(f.post));

        f.flaky.fail_favorites.store(true, Ordering::SeqCst);
        assert!(vm.toggle_favorite(f.post).await.is_err());
        assert!(vm.user().unwrap().is_favorite(f.post));
        assert_eq!(vm.favorite_posts().unwrap().len(), 1);
    }
}
