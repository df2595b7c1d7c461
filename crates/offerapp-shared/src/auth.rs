//! Auth backend error codes and their Spanish display strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shown for any code that has no entry in [`AUTH_MESSAGES`].
pub const GENERIC_AUTH_MESSAGE: &str = "Error al procesar la autenticación. Intenta nuevamente.";

pub const PROFILE_LOAD_FAILED_MESSAGE: &str = "No se pudo cargar el perfil del usuario.";
pub const PASSWORD_RESET_SENT_MESSAGE: &str =
    "Se ha enviado un correo para restablecer tu contraseña.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthErrorCode {
    UserNotFound,
    WrongPassword,
    EmailAlreadyInUse,
    WeakPassword,
    InvalidEmail,
    UserDisabled,
    UsernameTaken,
    UsernameNotFound,
    InvalidResetCode,
    NotSignedIn,
}

impl AuthErrorCode {
    pub fn as_code(&self) -> &'static str {
        match self {
            AuthErrorCode::UserNotFound => "ERROR_USER_NOT_FOUND",
            AuthErrorCode::WrongPassword => "ERROR_WRONG_PASSWORD",
            AuthErrorCode::EmailAlreadyInUse => "ERROR_EMAIL_ALREADY_IN_USE",
            AuthErrorCode::WeakPassword => "ERROR_WEAK_PASSWORD",
            AuthErrorCode::InvalidEmail => "ERROR_INVALID_EMAIL",
            AuthErrorCode::UserDisabled => "ERROR_USER_DISABLED",
            AuthErrorCode::UsernameTaken => "ERROR_USERNAME_TAKEN",
            AuthErrorCode::UsernameNotFound => "ERROR_USERNAME_NOT_FOUND",
            AuthErrorCode::InvalidResetCode => "ERROR_INVALID_RESET_CODE",
            AuthErrorCode::NotSignedIn => "ERROR_NO_SIGNED_IN_USER",
        }
    }

    pub fn message(&self) -> &'static str {
        auth_message(self.as_code())
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Backend error code -> display string.
pub const AUTH_MESSAGES: &[(&str, &str)] = &[
    ("ERROR_USER_NOT_FOUND", "El usuario no existe o fue eliminado."),
    ("ERROR_WRONG_PASSWORD", "El usuario y/o la contraseña no son correctos"),
    ("ERROR_INVALID_CREDENTIAL", "El usuario y/o la contraseña no son correctos"),
    ("ERROR_EMAIL_ALREADY_IN_USE", "Ya existe una cuenta con ese correo."),
    ("ERROR_WEAK_PASSWORD", "La contraseña es demasiado débil."),
    ("ERROR_INVALID_EMAIL", "El formato del correo electrónico no es válido."),
    ("ERROR_USER_DISABLED", "La cuenta ha sido deshabilitada."),
    ("ERROR_USERNAME_TAKEN", "El nombre de usuario ya está en uso."),
    ("ERROR_USERNAME_NOT_FOUND", "Nombre de usuario no encontrado."),
    (
        "ERROR_INVALID_RESET_CODE",
        "El enlace para restablecer la contraseña no es válido o expiró.",
    ),
];

/// Look up the display string for a raw backend code.
pub fn auth_message(code: &str) -> &'static str {
    AUTH_MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, msg)| *msg)
        .unwrap_or(GENERIC_AUTH_MESSAGE)
}

/// Shape check only; the backend decides whether the address exists.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}
