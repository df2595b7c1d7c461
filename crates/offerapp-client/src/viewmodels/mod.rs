//! Screen view-models.

pub mod auth;
pub mod feed;
pub mod main;
pub mod posts;
pub mod profile;
pub mod theme;
pub mod votes;

pub use auth::{AuthState, AuthViewModel};
pub use main::{MainState, MainViewModel};
pub use theme::ThemeViewModel;
