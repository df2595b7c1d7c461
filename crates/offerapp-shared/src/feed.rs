//! Client-side feed filters.
//!
//! Search and the "following" tab run over whatever pages the client has
//! fetched so far; they never hit the backend.

use std::collections::HashSet;

use crate::entities::Post;
use crate::types::{FeedTab, UserId};

/// Client-side half of the feed filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalFilter {
    pub tab: FeedTab,
    pub search_query: String,
}

impl LocalFilter {
    pub fn accepts(&self, post: &Post, following: &HashSet<UserId>) -> bool {
        if self.tab == FeedTab::Following && !following.contains(&post.author.uid) {
            return false;
        }
        matches_query(post, &self.search_query)
    }
}

/// Case-insensitive match on description or location. Blank matches all.
pub fn matches_query(post: &Post, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    post.description.to_lowercase().contains(&needle)
        || post.location.to_lowercase().contains(&needle)
}

pub fn apply_filters(posts: &[Post], filter: &LocalFilter, following: &HashSet<UserId>) -> Vec<Post> {
    posts
        .iter()
        .filter(|p| filter.accepts(p, following))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::entities::Author;
    use crate::types::{Category, PostId, PostStatus};

    fn post(author: UserId, description: &str, location: &str) -> Post {
        Post {
            id: PostId::new(),
            description: description.into(),
            price: 10.0,
            discount_price: 5.0,
            category: Category::Technology,
            store: "Tienda".into(),
            location: location.into(),
            latitude: 0.0,
            longitude: 0.0,
            image_url: String::new(),
            author: Author {
                uid: author,
                username: "u".into(),
                profile_image_url: None,
            },
            created_at: Utc::now(),
            status: PostStatus::Active,
            votes: vec![],
        }
    }

    #[test]
    fn search_matches_description_or_location_ignoring_case() {
        let a = UserId::new();
        let posts = vec![
            post(a, "Notebook en oferta", "Córdoba"),
            post(a, "Auriculares", "Rosario centro"),
            post(a, "Mouse", "Mendoza"),
        ];
        let filter = LocalFilter {
            tab: FeedTab::All,
            search_query: "  NOTEBOOK ".into(),
        };
        let out = apply_filters(&posts, &filter, &HashSet::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, posts[0].id);

        let filter = LocalFilter {
            tab: FeedTab::All,
            search_query: "rosario".into(),
        };
        assert_eq!(apply_filters(&posts, &filter, &HashSet::new())[0].id, posts[1].id);
    }

    #[test]
    fn following_tab_keeps_only_followed_authors() {
        let followed = UserId::new();
        let stranger = UserId::new();
        let posts = vec![post(followed, "a", "x"), post(stranger, "b", "y")];
        let following: HashSet<_> = [followed].into_iter().collect();
        let filter = LocalFilter {
            tab: FeedTab::Following,
            search_query: String::new(),
        };
        let out = apply_filters(&posts, &filter, &following);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].author.uid, followed);
    }

    #[test]
    fn default_filter_is_identity() {
        let a = UserId::new();
        let posts = vec![post(a, "a", "x"), post(a, "b", "y")];
        assert_eq!(apply_filters(&posts, &LocalFilter::default(), &HashSet::new()), posts);
    }
}
