//! # offerapp-shared
//!
//! Domain types and pure logic shared by the OfferApp store and client:
//! posts, votes, users and comments, the vote tally and expiry rule, the
//! client-side feed filters, and the auth error code table.

pub mod auth;
pub mod constants;
pub mod entities;
pub mod error;
pub mod feed;
pub mod types;
pub mod votes;

pub use auth::AuthErrorCode;
pub use entities::*;
pub use error::{ValidationError, VoteError};
pub use types::*;
