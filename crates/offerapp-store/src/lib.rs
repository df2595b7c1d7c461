//! # offerapp-store
//!
//! Embedded stand-in for OfferApp's managed backend, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection`, with typed helpers for posts, votes, comments,
//! users and accounts, plus an async [`ImageStore`] that keeps uploaded
//! images on disk and hands back their URLs.

pub mod accounts;
pub mod comments;
pub mod cursor;
pub mod database;
pub mod images;
pub mod migrations;
pub mod models;
pub mod posts;
pub mod users;
pub mod votes;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use images::ImageStore;
pub use models::*;
