//! Email/password accounts standing in for the managed auth service.
//!
//! Passwords are stored as Argon2id PHC strings. Every refusal is reported as [`StoreError::Auth`] carrying the code
//! the client translates for display.

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{Duration, Utc};
use offerapp_shared::auth::is_valid_email;
use offerapp_shared::constants::{MIN_PASSWORD_LEN, PASSWORD_RESET_TTL_MINUTES};
use offerapp_shared::{AuthErrorCode, User, UserId};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::{fmt_ts, parse_ts, Database};
use crate::error::{Result, StoreError};
use crate::models::ResetTicket;
use crate::users::{insert_user, new_user};

struct AccountRow {
    uid: UserId,
    hash: String,
    disabled: bool,
}

impl Database {
    /// Create the account and its profile in one transaction, then sign in.
    pub fn sign_up(&mut self, email: &str, password: &str, username: &str) -> Result<User> {
        let email = email.trim();
        let username = username.trim();

        if self.is_username_taken(username)? {
            return Err(AuthErrorCode::UsernameTaken.into());
        }
        if !is_valid_email(email) {
            return Err(AuthErrorCode::InvalidEmail.into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthErrorCode::WeakPassword.into());
        }
        if self.account_by_email(email)?.is_some() {
            return Err(AuthErrorCode::EmailAlreadyInUse.into());
        }

        let user = new_user(username, email);
        let hash = hash_password(password)?;

        let tx = self.conn_mut().transaction()?;
        insert_user(&tx, &user)?;
        tx.execute(
            "INSERT INTO accounts (uid, email, password_hash, disabled, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![
                user.uid.to_string(),
                email,
                hash,
                fmt_ts(&Utc::now()),
            ],
        )?;
        set_current(&tx, Some(user.uid))?;
        tx.commit()?;

        tracing::info!(uid = %user.uid, username = %user.username, "account created");
        Ok(user)
    }

    /// Sign in with an email, or with a username resolved to its email.
    pub fn sign_in(&self, identifier: &str, password: &str) -> Result<User> {
        let identifier = identifier.trim();
        let email = if identifier.contains('@') {
            identifier.to_string()
        } else {
            self.find_user_by_username(identifier)?
                .ok_or(StoreError::Auth(AuthErrorCode::UsernameNotFound))?
                .email
        };

        if !is_valid_email(&email) {
            return Err(AuthErrorCode::InvalidEmail.into());
        }
        let account = self
            .account_by_email(&email)?
            .ok_or(StoreError::Auth(AuthErrorCode::UserNotFound))?;
        if account.disabled {
            return Err(AuthErrorCode::UserDisabled.into());
        }
        if !verify_password(password, &account.hash)? {
            tracing::warn!(uid = %account.uid, "sign-in with wrong password");
            return Err(AuthErrorCode::WrongPassword.into());
        }

        set_current(self.conn(), Some(account.uid))?;
        tracing::info!(uid = %account.uid, "signed in");
        self.get_user(account.uid)
    }

    pub fn sign_out(&self) -> Result<()> {
        set_current(self.conn(), None)
    }

    /// The signed-in user id, if any survives from a previous session.
    pub fn current_user_id(&self) -> Result<Option<UserId>> {
        let uid: Option<Option<String>> = self
            .conn()
            .query_row("SELECT uid FROM auth_state WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        match uid.flatten() {
            Some(uid) => Ok(Some(UserId::parse(&uid)?)),
            None => Ok(None),
        }
    }

    /// Record a reset ticket for `email`. The caller hands the token to mail.
    pub fn request_password_reset(&self, email: &str) -> Result<ResetTicket> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthErrorCode::InvalidEmail.into());
        }
        let account = self
            .account_by_email(email)?
            .ok_or(StoreError::Auth(AuthErrorCode::UserNotFound))?;

        let ticket = ResetTicket {
            token: Uuid::new_v4().to_string(),
            email: email.to_string(),
            expires_at: Utc::now() + Duration::minutes(PASSWORD_RESET_TTL_MINUTES),
        };
        self.conn().execute(
            "INSERT INTO password_resets (token, uid, expires_at) VALUES (?1, ?2, ?3)",
            params![ticket.token, account.uid.to_string(), fmt_ts(&ticket.expires_at)],
        )?;

        tracing::info!(uid = %account.uid, expires_at = %ticket.expires_at, "password reset requested");
        Ok(ticket)
    }

    /// Consume a reset token and set a new password.
    pub fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<()> {
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT uid, expires_at FROM password_resets WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (uid, expires_at) = row.ok_or(StoreError::Auth(AuthErrorCode::InvalidResetCode))?;

        if parse_ts(1, &expires_at)? < Utc::now() {
            self.conn()
                .execute("DELETE FROM password_resets WHERE token = ?1", params![token])?;
            return Err(AuthErrorCode::InvalidResetCode.into());
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthErrorCode::WeakPassword.into());
        }

        self.conn().execute(
            "UPDATE accounts SET password_hash = ?1 WHERE uid = ?2",
            params![hash_password(new_password)?, uid],
        )?;
        self.conn()
            .execute("DELETE FROM password_resets WHERE uid = ?1", params![uid])?;

        tracing::info!(%uid, "password reset completed");
        Ok(())
    }

    pub fn set_account_disabled(&self, uid: UserId, disabled: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE accounts SET disabled = ?1 WHERE uid = ?2",
            params![disabled as i32, uid.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        let row = self
            .conn()
            .query_row(
                "SELECT uid, password_hash, disabled FROM accounts WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i32>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((uid, hash, disabled)) => Ok(Some(AccountRow {
                uid: UserId::parse(&uid)?,
                hash,
                disabled: disabled != 0,
            })),
            None => Ok(None),
        }
    }
}

/// Argon2id with a fresh salt, as a PHC string.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))
}

/// `Ok(false)` on mismatch; a stored hash that does not parse is an error.
fn verify_password(password: &str, phc: &str) -> Result<bool> {
    let parsed = PasswordHash::new(phc).map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn set_current(conn: &rusqlite::Connection, uid: Option<UserId>) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO auth_state (id, uid) VALUES (1, ?1)",
        params![uid.map(|u| u.to_string())],
    )?;
    Ok(())
}
