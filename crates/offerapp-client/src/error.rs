use offerapp_shared::{PostId, ValidationError, VoteError};
use thiserror::Error;

use crate::backend::{validation_message, BackendError};

/// Errors surfaced by the view-models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Post {0} is not loaded")]
    PostNotLoaded(PostId),

    #[error("Users cannot vote on their own posts")]
    OwnPost,

    #[error("Post is not active, cannot change score")]
    PostNotActive,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl From<VoteError> for ClientError {
    fn from(e: VoteError) -> Self {
        match e {
            VoteError::PostExpired => ClientError::PostNotActive,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClientError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        ClientError::LockPoisoned
    }
}

impl ClientError {
    /// Spanish display string for the UI.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Backend(e) => e.user_message(),
            ClientError::Validation(e) => validation_message(e).to_string(),
            ClientError::PostNotLoaded(_) => "La oferta ya no está disponible.".into(),
            ClientError::OwnPost => "No puedes votar tu propia oferta.".into(),
            ClientError::PostNotActive => "La oferta está vencida.".into(),
            ClientError::InvalidInput(msg) => msg.clone(),
            ClientError::UnknownRoute(_)
            | ClientError::Session(_)
            | ClientError::LockPoisoned => {
                "No se pudo completar la operación. Intenta nuevamente.".into()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
