use rusqlite::Connection;

const UP_SQL: &str = r#"
ALTER TABLE users ADD COLUMN push_token TEXT;

CREATE TABLE IF NOT EXISTS follows (
    follower_id TEXT NOT NULL,                     -- FK -> users(uid)
    followee_id TEXT NOT NULL,                     -- FK -> users(uid)
    PRIMARY KEY (follower_id, followee_id),
    FOREIGN KEY (follower_id) REFERENCES users(uid) ON DELETE CASCADE,
    FOREIGN KEY (followee_id) REFERENCES users(uid) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id);

CREATE TABLE IF NOT EXISTS favorites (
    user_id TEXT NOT NULL,                         -- FK -> users(uid)
    post_id TEXT NOT NULL,                         -- FK -> posts(id)
    PRIMARY KEY (user_id, post_id),
    FOREIGN KEY (user_id) REFERENCES users(uid) ON DELETE CASCADE,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

-- Auth accounts, one per user
CREATE TABLE IF NOT EXISTS accounts (
    uid           TEXT PRIMARY KEY NOT NULL,       -- FK -> users(uid)
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,                   -- Argon2id PHC string
    disabled      INTEGER NOT NULL DEFAULT 0,      -- boolean 0/1
    created_at    TEXT NOT NULL,
    FOREIGN KEY (uid) REFERENCES users(uid) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS password_resets (
    token      TEXT PRIMARY KEY NOT NULL,          -- UUID v4
    uid        TEXT NOT NULL,                      -- FK -> accounts(uid)
    expires_at TEXT NOT NULL,
    FOREIGN KEY (uid) REFERENCES accounts(uid) ON DELETE CASCADE
);

-- Signed-in user, single row
CREATE TABLE IF NOT EXISTS auth_state (
    id  INTEGER PRIMARY KEY CHECK (id = 1),
    uid TEXT
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
