//! Login, registration, password reset and logout.

use std::sync::{Arc, Mutex};

use offerapp_shared::auth::{is_valid_email, PASSWORD_RESET_SENT_MESSAGE, PROFILE_LOAD_FAILED_MESSAGE};
use offerapp_shared::constants::MIN_PASSWORD_LEN;
use offerapp_shared::User;

use crate::backend::{Backend, BackendError};
use crate::error::Result;
use crate::session::SessionManager;

const EMPTY_EMAIL_MESSAGE: &str = "El correo no puede estar vacío.";
const INVALID_EMAIL_MESSAGE: &str = "El correo no tiene un formato válido.";
const EMPTY_USERNAME_MESSAGE: &str = "El nombre de usuario no puede estar vacío.";
const EMPTY_IDENTIFIER_MESSAGE: &str = "Ingresa tu correo o nombre de usuario.";
const SHORT_PASSWORD_MESSAGE: &str = "La contraseña debe tener al menos 6 caracteres.";
const PASSWORD_UPDATED_MESSAGE: &str = "Tu contraseña fue actualizada.";

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Idle,
    Loading,
    Success(User),
    Error(String),
    PasswordResetSuccess(String),
}

#[derive(Clone)]
pub struct AuthViewModel {
    backend: Arc<dyn Backend>,
    session: SessionManager,
    state: Arc<Mutex<AuthState>>,
}

impl AuthViewModel {
    /// Build the view-model and restore the previous session, if any.
    pub async fn new(backend: Arc<dyn Backend>, session: SessionManager) -> Self {
        let vm = Self {
            backend,
            session,
            state: Arc::new(Mutex::new(AuthState::Idle)),
        };
        vm.restore().await;
        vm
    }

    pub fn state(&self) -> AuthState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_state(&self, next: AuthState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// The signed-in user, when the last action succeeded.
    pub fn current_user(&self) -> Option<User> {
        match self.state() {
            AuthState::Success(user) => Some(user),
            _ => None,
        }
    }

    async fn restore(&self) {
        if !self.session.is_logged_in().await {
            return;
        }
        let uid = match self.backend.current_user_id().await {
            Ok(Some(uid)) => uid,
            Ok(None) => {
                tracing::info!("persisted session has no signed-in user, clearing");
                self.forget_session().await;
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not restore session");
                return;
            }
        };
        match self.backend.get_user(uid).await {
            Ok(Some(user)) => {
                tracing::info!(%uid, "session restored");
                self.set_state(AuthState::Success(user));
            }
            Ok(None) => {
                tracing::warn!(%uid, "signed-in user has no profile, clearing session");
                self.forget_session().await;
            }
            Err(e) => {
                tracing::warn!(%uid, error = %e, "could not load profile for restored session");
                self.set_state(AuthState::Error(PROFILE_LOAD_FAILED_MESSAGE.into()));
            }
        }
    }

    /// Sign in with an email or a username.
    pub async fn login(&self, identifier: &str, password: &str) -> AuthState {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return self.error(EMPTY_IDENTIFIER_MESSAGE);
        }

        self.set_state(AuthState::Loading);
        let signed_in = match self.backend.sign_in(identifier, password).await {
            Ok(user) => user,
            Err(e) => return self.backend_error("login", e),
        };

        // the profile document is the source of truth, not the auth record
        let user = match self.backend.get_user(signed_in.uid).await {
            Ok(Some(user)) => user,
            Ok(None) => return self.error(PROFILE_LOAD_FAILED_MESSAGE),
            Err(e) => {
                tracing::warn!(uid = %signed_in.uid, error = %e, "profile load failed");
                return self.error(PROFILE_LOAD_FAILED_MESSAGE);
            }
        };
        self.signed_in(user).await
    }

    pub async fn register(&self, email: &str, password: &str, username: &str) -> AuthState {
        let email = email.trim();
        let username = username.trim();
        if email.is_empty() {
            return self.error(EMPTY_EMAIL_MESSAGE);
        }
        if !is_valid_email(email) {
            return self.error(INVALID_EMAIL_MESSAGE);
        }
        if username.is_empty() {
            return self.error(EMPTY_USERNAME_MESSAGE);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return self.error(SHORT_PASSWORD_MESSAGE);
        }

        self.set_state(AuthState::Loading);
        match self.backend.sign_up(email, password, username).await {
            Ok(user) => {
                tracing::info!(uid = %user.uid, username = %user.username, "account created");
                self.signed_in(user).await
            }
            Err(e) => self.backend_error("register", e),
        }
    }

    /// Ask the backend to mail a reset link.
    pub async fn reset_password(&self, email: &str) -> AuthState {
        let email = email.trim();
        if email.is_empty() {
            return self.error(EMPTY_EMAIL_MESSAGE);
        }
        self.set_state(AuthState::Loading);
        match self.backend.send_password_reset(email).await {
            Ok(()) => self.finish(AuthState::PasswordResetSuccess(PASSWORD_RESET_SENT_MESSAGE.into())),
            Err(e) => self.backend_error("reset_password", e),
        }
    }

    /// Complete a reset with the token from the mailed link.
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AuthState {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return self.error(SHORT_PASSWORD_MESSAGE);
        }
        self.set_state(AuthState::Loading);
        match self.backend.confirm_password_reset(token.trim(), new_password).await {
            Ok(()) => self.finish(AuthState::PasswordResetSuccess(PASSWORD_UPDATED_MESSAGE.into())),
            Err(e) => self.backend_error("confirm_password_reset", e),
        }
    }

    pub async fn logout(&self) -> Result<()> {
        let signed_out = self.backend.sign_out().await;
        self.forget_session().await;
        self.set_state(AuthState::Idle);
        signed_out.map_err(Into::into)
    }

    /// Back to `Idle` once the screen has consumed a result.
    pub fn reset_auth_state(&self) {
        self.set_state(AuthState::Idle);
    }

    /// Surface a message produced by the screen itself.
    pub fn set_ui_error(&self, message: impl Into<String>) {
        self.set_state(AuthState::Error(message.into()));
    }

    async fn signed_in(&self, user: User) -> AuthState {
        if let Err(e) = self.session.save_session_state(true).await {
            tracing::warn!(error = %e, "failed to persist session flag");
        }
        self.finish(AuthState::Success(user))
    }

    async fn forget_session(&self) {
        if let Err(e) = self.session.clear_session().await {
            tracing::warn!(error = %e, "failed to clear session");
        }
    }

    fn backend_error(&self, action: &str, err: BackendError) -> AuthState {
        tracing::warn!(action, error = %err, "auth action failed");
        self.finish(AuthState::Error(err.user_message()))
    }

    fn error(&self, message: &str) -> AuthState {
        self.finish(AuthState::Error(message.into()))
    }

    fn finish(&self, state: AuthState) -> AuthState {
        self.set_state(state.clone());
        state
    }
}
