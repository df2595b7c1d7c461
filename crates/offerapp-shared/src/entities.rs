//! Domain entities exchanged between the backend and the view-models.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_STORE;
use crate::error::ValidationError;
use crate::types::{Category, CommentId, PostId, PostStatus, UserId, VoteValue};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: UserId,
    pub username: String,
    pub email: String,
    pub profile_image_url: Option<String>,
    pub followers: HashSet<UserId>,
    pub following: HashSet<UserId>,
    pub favorites: HashSet<PostId>,
}

impl User {
    pub fn summary(&self) -> Author {
        Author {
            uid: self.uid,
            username: self.username.clone(),
            profile_image_url: self.profile_image_url.clone(),
        }
    }

    pub fn is_following(&self, other: UserId) -> bool {
        self.following.contains(&other)
    }

    pub fn is_favorite(&self, post: PostId) -> bool {
        self.favorites.contains(&post)
    }
}

/// The author snapshot embedded in posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub uid: UserId,
    pub username: String,
    pub profile_image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: UserId,
    pub value: VoteValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub description: String,
    pub price: f64,
    pub discount_price: f64,
    pub category: Category,
    pub store: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub status: PostStatus,
    /// Votes in the order they were first cast.
    pub votes: Vec<Vote>,
}

impl Post {
    pub fn is_active(&self) -> bool {
        self.status == PostStatus::Active
    }

    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author.uid == user
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Post input
// ---------------------------------------------------------------------------

/// Editable fields of a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostDetails {
    pub description: String,
    pub price: f64,
    pub discount_price: f64,
    pub category: Category,
    pub store: String,
}

impl PostDetails {
    /// Check prices and category, and fill in the placeholder store name.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        if self.category == Category::All {
            return Err(ValidationError::MissingCategory);
        }
        for p in [self.price, self.discount_price] {
            if !p.is_finite() || p < 0.0 {
                return Err(ValidationError::InvalidPrice(p));
            }
        }
        if self.discount_price >= self.price {
            return Err(ValidationError::DiscountNotLower {
                price: self.price,
                discount: self.discount_price,
            });
        }
        let store = self.store.trim();
        self.store = if store.is_empty() {
            UNKNOWN_STORE.to_string()
        } else {
            store.to_string()
        };
        self.description = self.description.trim().to_string();
        Ok(self)
    }
}

/// Everything needed to publish a post except the image bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[serde(flatten)]
    pub details: PostDetails,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewPost {
    pub fn validated(self) -> Result<Self, ValidationError> {
        let details = self.details.validated()?;
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(ValidationError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        Ok(Self {
            details,
            location: self.location.trim().to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}
