use thiserror::Error;

/// Input rejected before it reaches the backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown post status: {0}")]
    UnknownStatus(String),

    #[error("Invalid vote value: {0}")]
    InvalidVoteValue(i64),

    #[error("A post needs a concrete category")]
    MissingCategory,

    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    #[error("Discounted price {discount} must be lower than price {price}")]
    DiscountNotLower { price: f64, discount: f64 },

    #[error("Coordinates out of range: ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Comment text is empty")]
    EmptyComment,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteError {
    #[error("Post is not active, cannot change score")]
    PostExpired,
}
