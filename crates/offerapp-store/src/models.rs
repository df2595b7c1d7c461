//! Store-side records that are not part of the shared domain model.

use chrono::{DateTime, Utc};
use offerapp_shared::{PageCursor, Post};
use serde::{Deserialize, Serialize};

/// One page of the feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub posts: Vec<Post>,
    /// `None` once the query has no rows past this page.
    pub next_cursor: Option<PageCursor>,
}

/// An outstanding password reset.  Delivery of the token is the mail
/// service's job; the store only records it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetTicket {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}
