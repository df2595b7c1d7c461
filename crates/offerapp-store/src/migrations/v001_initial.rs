//! v001 -- Initial schema creation.
//!
//! Creates the four document collections: `users`, `posts`, `votes` and
//! `comments`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    uid               TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username          TEXT NOT NULL UNIQUE,
    email             TEXT NOT NULL,
    profile_image_url TEXT,
    created_at        TEXT NOT NULL                -- RFC-3339, fixed width
);

-- ----------------------------------------------------------------
-- Posts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id             TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    author_id      TEXT NOT NULL,                  -- FK -> users(uid)
    description    TEXT NOT NULL,
    price          REAL NOT NULL,
    discount_price REAL NOT NULL,
    category       TEXT NOT NULL,                  -- category label
    store          TEXT NOT NULL,
    location       TEXT NOT NULL,
    latitude       REAL NOT NULL,
    longitude      REAL NOT NULL,
    image_url      TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'activa', -- 'activa' | 'vencida'
    score          INTEGER NOT NULL DEFAULT 0,     -- SUM(votes.value)
    created_at     TEXT NOT NULL,

    FOREIGN KEY (author_id) REFERENCES users(uid) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_status_created ON posts(status, created_at);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);

-- ----------------------------------------------------------------
-- Votes (ordered by seq, one per user per post)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS votes (
    seq     INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id TEXT NOT NULL,                         -- FK -> posts(id)
    user_id TEXT NOT NULL,
    value   INTEGER NOT NULL CHECK (value IN (-1, 1)),

    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_votes_unique ON votes(post_id, user_id);

-- ----------------------------------------------------------------
-- Comments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS comments (
    id         TEXT PRIMARY KEY NOT NULL,          -- UUID v4
    post_id    TEXT NOT NULL,                      -- FK -> posts(id)
    author_id  TEXT NOT NULL,                      -- FK -> users(uid)
    text       TEXT NOT NULL,
    created_at TEXT NOT NULL,                      -- assigned by the store

    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES users(uid) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_comments_author ON comments(author_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
