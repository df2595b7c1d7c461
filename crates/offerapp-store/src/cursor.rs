//! Opaque keyset cursors for feed pagination.
//!
//! A cursor is `base64url(json({sort, key, id}))` where `key` is the sort
//! column value of the last post on the page and `id` breaks ties, so the
//! next page starts strictly after it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use offerapp_shared::{PageCursor, Post, SortOption};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::fmt_ts;
use crate::error::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt(String),
    Price(f64),
    Score(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyset {
    pub sort: SortOption,
    pub key: SortKey,
    pub id: Uuid,
}

impl Keyset {
    /// Keyset positioned on `post` under `sort`.
    pub fn after(sort: SortOption, post: &Post) -> Self {
        let key = match sort {
            SortOption::Newest => SortKey::CreatedAt(fmt_ts(&post.created_at)),
            SortOption::PriceAsc | SortOption::PriceDesc => SortKey::Price(post.price),
            SortOption::Score => SortKey::Score(post.score()),
        };
        Self {
            sort,
            key,
            id: post.id.0,
        }
    }
}

pub fn encode(keyset: &Keyset) -> Result<PageCursor> {
    let json =
        serde_json::to_vec(keyset).map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
    Ok(PageCursor(URL_SAFE_NO_PAD.encode(json)))
}

/// Decode a cursor and check it was issued for `sort`.
pub fn decode(cursor: &PageCursor, sort: SortOption) -> Result<Keyset> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.as_str())
        .map_err(|e| StoreError::InvalidCursor(format!("not base64: {e}")))?;
    let keyset: Keyset = serde_json::from_slice(&bytes)
        .map_err(|e| StoreError::InvalidCursor(format!("bad payload: {e}")))?;

    let key_fits = matches!(
        (&keyset.sort, &keyset.key),
        (SortOption::Newest, SortKey::CreatedAt(_))
            | (SortOption::PriceAsc | SortOption::PriceDesc, SortKey::Price(_))
            | (SortOption::Score, SortKey::Score(_))
    );
    if keyset.sort != sort || !key_fits {
        return Err(StoreError::InvalidCursor(format!(
            "cursor was issued for {:?}, query sorts by {:?}",
            keyset.sort, sort
        )));
    }
    Ok(keyset)
}
