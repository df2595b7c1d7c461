//! User profiles, the follow graph and favourites.

use std::collections::HashSet;

use chrono::Utc;
use offerapp_shared::{AuthErrorCode, PostId, User, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{fmt_ts, parse_uuid, Database};
use crate::error::{not_found, Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a profile without an auth account (seeding, tests).
    pub fn create_user(&self, username: &str, email: &str) -> Result<User> {
        let user = new_user(username, email);
        insert_user(self.conn(), &user)?;
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, uid: UserId) -> Result<User> {
        load_user(self.conn(), uid)
    }

    /// Users for the ids that exist; unknown ids are skipped.
    pub fn get_users(&self, uids: &[UserId]) -> Result<Vec<User>> {
        let mut users = Vec::with_capacity(uids.len());
        for uid in uids {
            match self.get_user(*uid) {
                Ok(user) => users.push(user),
                Err(StoreError::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(users)
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let uid: Option<String> = self
            .conn()
            .query_row(
                "SELECT uid FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        match uid {
            Some(uid) => Ok(Some(self.get_user(UserId::parse(&uid)?)?)),
            None => Ok(None),
        }
    }

    pub fn is_username_taken(&self, username: &str) -> Result<bool> {
        Ok(self.find_user_by_username(username)?.is_some())
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    pub fn set_profile_image_url(&self, uid: UserId, url: &str) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET profile_image_url = ?1 WHERE uid = ?2",
            params![url, uid.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_push_token(&self, uid: UserId, token: &str) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET push_token = ?1 WHERE uid = ?2",
            params![token, uid.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn push_token(&self, uid: UserId) -> Result<Option<String>> {
        self.conn()
            .query_row(
                "SELECT push_token FROM users WHERE uid = ?1",
                params![uid.to_string()],
                |row| row.get(0),
            )
            .map_err(not_found)
    }

    /// Add the follow edge. Both users must exist; following twice is a no-op.
    pub fn follow_user(&mut self, follower: UserId, followee: UserId) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        ensure_user(&tx, follower)?;
        ensure_user(&tx, followee)?;
        tx.execute(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id) VALUES (?1, ?2)",
            params![follower.to_string(), followee.to_string()],
        )?;
        tx.commit()?;
        tracing::info!(%follower, %followee, "followed");
        Ok(())
    }

    pub fn unfollow_user(&mut self, follower: UserId, followee: UserId) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        ensure_user(&tx, follower)?;
        ensure_user(&tx, followee)?;
        tx.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower.to_string(), followee.to_string()],
        )?;
        tx.commit()?;
        tracing::info!(%follower, %followee, "unfollowed");
        Ok(())
    }

    pub fn add_favorite(&self, uid: UserId, post: PostId) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO favorites (user_id, post_id) VALUES (?1, ?2)",
            params![uid.to_string(), post.to_string()],
        )?;
        Ok(())
    }

    pub fn remove_favorite(&self, uid: UserId, post: PostId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND post_id = ?2",
            params![uid.to_string(), post.to_string()],
        )?;
        Ok(affected > 0)
    }
}

pub(crate) fn new_user(username: &str, email: &str) -> User {
    User {
        uid: UserId::new(),
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        profile_image_url: None,
        followers: HashSet::new(),
        following: HashSet::new(),
        favorites: HashSet::new(),
    }
}

pub(crate) fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (uid, username, email, profile_image_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.uid.to_string(),
            user.username,
            user.email,
            user.profile_image_url,
            fmt_ts(&Utc::now()),
        ],
    )
    .map_err(|e| {
        if is_username_conflict(&e) {
            StoreError::Auth(AuthErrorCode::UsernameTaken)
        } else {
            StoreError::Sqlite(e)
        }
    })?;
    Ok(())
}

/// UNIQUE violation on `users.username`; other constraint failures pass through.
fn is_username_conflict(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, Some(msg)) => {
            err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && msg.contains("users.username")
        }
        _ => false,
    }
}

fn ensure_user(conn: &Connection, uid: UserId) -> Result<()> {
    conn.query_row(
        "SELECT 1 FROM users WHERE uid = ?1",
        params![uid.to_string()],
        |_| Ok(()),
    )
    .map_err(not_found)
}

pub(crate) fn load_user(conn: &Connection, uid: UserId) -> Result<User> {
    let key = uid.to_string();
    let (username, email, profile_image_url) = conn
        .query_row(
            "SELECT username, email, profile_image_url FROM users WHERE uid = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .map_err(not_found)?;

    let following = id_set(conn, "SELECT followee_id FROM follows WHERE follower_id = ?1", &key)?
        .into_iter()
        .map(UserId)
        .collect();
    let followers = id_set(conn, "SELECT follower_id FROM follows WHERE followee_id = ?1", &key)?
        .into_iter()
        .map(UserId)
        .collect();
    let favorites = id_set(conn, "SELECT post_id FROM favorites WHERE user_id = ?1", &key)?
        .into_iter()
        .map(PostId)
        .collect();

    Ok(User {
        uid,
        username,
        email,
        profile_image_url,
        followers,
        following,
        favorites,
    })
}

fn id_set(conn: &Connection, sql: &str, key: &str) -> Result<Vec<uuid::Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![key], |row| {
        let id: String = row.get(0)?;
        parse_uuid(0, &id)
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::Sqlite)
}
