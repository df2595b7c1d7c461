//! Transactional vote updates.
//!
//! A vote is a read-modify-write over the post's vote list: load the
//! ordered votes, apply the toggle/replace rule, persist the single row that
//! changed, then store the new total and, below the threshold, the expired
//! status. The whole thing runs in an IMMEDIATE transaction so concurrent
//! voters serialise on the write lock; a busy database is retried a bounded
//! number of times.

use offerapp_shared::constants::MAX_VOTE_TX_ATTEMPTS;
use offerapp_shared::votes::{self, VoteChange};
use offerapp_shared::{Post, PostId, PostStatus, UserId, Vote, VoteValue};
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};

use crate::database::{parse_uuid, Database};
use crate::error::{not_found, Result, StoreError};
use crate::posts::load_post;

impl Database {
    /// Cast `value` on `post_id` for `user` and return the reconciled post.
    pub fn apply_vote(&mut self, post_id: PostId, user: UserId, value: VoteValue) -> Result<Post> {
        let mut attempt = 1;
        loop {
            match self.apply_vote_once(post_id, user, value) {
                Err(StoreError::Sqlite(e)) if is_busy(&e) && attempt < MAX_VOTE_TX_ATTEMPTS => {
                    tracing::warn!(post = %post_id, attempt, "vote transaction busy, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn apply_vote_once(&mut self, post_id: PostId, user: UserId, value: VoteValue) -> Result<Post> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let status: String = tx
            .query_row(
                "SELECT status FROM posts WHERE id = ?1",
                params![post_id.to_string()],
                |row| row.get(0),
            )
            .map_err(not_found)?;
        let status: PostStatus = status.parse()?;
        if status != PostStatus::Active {
            return Err(StoreError::PostNotActive);
        }

        let mut list = votes_for_post(&tx, post_id)?;
        let change = votes::apply_vote(&mut list, user, value);

        let (post_key, user_key) = (post_id.to_string(), user.to_string());
        match change {
            VoteChange::Added => tx.execute(
                "INSERT INTO votes (post_id, user_id, value) VALUES (?1, ?2, ?3)",
                params![post_key, user_key, value.as_i64()],
            )?,
            VoteChange::Replaced { .. } => tx.execute(
                "UPDATE votes SET value = ?3 WHERE post_id = ?1 AND user_id = ?2",
                params![post_key, user_key, value.as_i64()],
            )?,
            VoteChange::Removed => tx.execute(
                "DELETE FROM votes WHERE post_id = ?1 AND user_id = ?2",
                params![post_key, user_key],
            )?,
        };

        let total = votes::total_score(&list);
        let next = votes::status_after(status, total);
        tx.execute(
            "UPDATE posts SET score = ?1, status = ?2 WHERE id = ?3",
            params![total, next.as_str(), post_key],
        )?;

        let post = load_post(&tx, post_id)?;
        tx.commit()?;

        tracing::debug!(post = %post_id, user = %user, ?change, total, status = %next, "vote applied");
        if next != status {
            tracing::info!(post = %post_id, total, "post expired by score");
        }
        Ok(post)
    }
}

/// Votes on a post in the order they were first cast.
pub(crate) fn votes_for_post(conn: &Connection, post_id: PostId) -> Result<Vec<Vote>> {
    let mut stmt =
        conn.prepare("SELECT user_id, value FROM votes WHERE post_id = ?1 ORDER BY seq ASC")?;
    let rows = stmt.query_map(params![post_id.to_string()], |row| {
        let user: String = row.get(0)?;
        let value: i64 = row.get(1)?;
        let value = VoteValue::try_from(value).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Integer, Box::new(e))
        })?;
        Ok(Vote {
            user_id: UserId(parse_uuid(0, &user)?),
            value,
        })
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::Sqlite)
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

#[cfg(test)]
mod tests {
    use offerapp_shared::{Category, NewPost, PostDetails};

    use super::*;

    fn setup() -> (Database, PostId, UserId) {
        let db = Database::open_in_memory().unwrap();
        let author = db.create_user("autor", "autor@example.com").unwrap().uid;
        let post = db
            .create_post(
                author,
                NewPost {
                    details: PostDetails {
                        description: "TV".into(),
                        price: 1000.0,
                        discount_price: 800.0,
                        category: Category::Technology,
                        store: "Casa".into(),
                    },
                    location: "Centro".into(),
                    latitude: 0.0,
                    longitude: 0.0,
                },
                "file:///tv",
            )
            .unwrap();
        (db, post.id, author)
    }

    fn voter(db: &Database, n: usize) -> UserId {
        db.create_user(&format!("v{n}"), &format!("v{n}@example.com"))
            .unwrap()
            .uid
    }

    #[test]
    fn toggle_replace_and_score_column() {
        let (mut db, post, _) = setup();
        let a = voter(&db, 1);
        let b = voter(&db, 2);

        db.apply_vote(post, a, VoteValue::Up).unwrap();
        let p = db.apply_vote(post, b, VoteValue::Up).unwrap();
        assert_eq!(p.score(), 2);

        // a flips, keeping the first slot
        let p = db.apply_vote(post, a, VoteValue::Down).unwrap();
        assert_eq!(p.votes[0].user_id, a);
        assert_eq!(p.votes[0].value, VoteValue::Down);
        assert_eq!(p.score(), 0);

        // b withdraws
        let p = db.apply_vote(post, b, VoteValue::Up).unwrap();
        assert_eq!(p.votes.len(), 1);
        assert_eq!(p.user_vote(b), None);

        let stored: i64 = db
            .conn()
            .query_row("SELECT score FROM posts WHERE id = ?1", params![post.to_string()], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(stored, -1);
    }

    #[test]
    fn sixteenth_net_downvote_expires_and_locks_the_post() {
        let (mut db, post, _) = setup();
        let voters: Vec<_> = (0..19).map(|i| voter(&db, i)).collect();

        for v in &voters[..2] {
            db.apply_vote(post, *v, VoteValue::Up).unwrap();
        }
        let mut last = None;
        for v in &voters[2..19] {
            last = Some(db.apply_vote(post, *v, VoteValue::Down).unwrap());
        }
        let p = last.unwrap();
        assert_eq!(p.score(), -15);
        assert_eq!(p.status, PostStatus::Active);

        let extra = voter(&db, 100);
        let p = db.apply_vote(post, extra, VoteValue::Down).unwrap();
        assert_eq!(p.score(), -16);
        assert_eq!(p.status, PostStatus::Expired);

        assert!(matches!(
            db.apply_vote(post, voters[0], VoteValue::Up),
            Err(StoreError::PostNotActive)
        ));
        assert_eq!(db.get_post(post).unwrap().status, PostStatus::Expired);
    }

    #[test]
    fn store_does_not_block_author_votes() {
        let (mut db, post, author) = setup();
        let p = db.apply_vote(post, author, VoteValue::Up).unwrap();
        assert_eq!(p.user_vote(author), Some(VoteValue::Up));
    }

    fn file_backed(dir: &tempfile::TempDir) -> (Database, PostId, UserId) {
        let path = dir.path().join("votes.db");
        let db = Database::open_at(&path).unwrap();
        let author = db.create_user("autor", "autor@example.com").unwrap().uid;
        let post = db
            .create_post(
                author,
                NewPost {
                    details: PostDetails {
                        description: "Radio".into(),
                        price: 50.0,
                        discount_price: 40.0,
                        category: Category::Technology,
                        store: "Casa".into(),
                    },
                    location: "Centro".into(),
                    latitude: 0.0,
                    longitude: 0.0,
                },
                "file:///radio",
            )
            .unwrap();
        let voter = voter(&db, 1);
        (db, post.id, voter)
    }

    #[test]
    fn short_write_lock_is_waited_out() {
        let dir = tempfile::tempdir().unwrap();
        let (mut db, post, voter) = file_backed(&dir);

        let other = Connection::open(dir.path().join("votes.db")).unwrap();
        other.execute_batch("BEGIN IMMEDIATE").unwrap();
        let holder = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(400));
            other.execute_batch("COMMIT").unwrap();
        });

        let p = db.apply_vote(post, voter, VoteValue::Up).unwrap();
        holder.join().unwrap();
        assert_eq!(p.score(), 1);
    }

    #[test]
    fn write_lock_held_past_every_attempt_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let (mut db, post, voter) = file_backed(&dir);

        let other = Connection::open(dir.path().join("votes.db")).unwrap();
        other.execute_batch("BEGIN IMMEDIATE").unwrap();

        let started = std::time::Instant::now();
        let err = db.apply_vote(post, voter, VoteValue::Up).unwrap_err();
        let elapsed = started.elapsed();
        other.execute_batch("COMMIT").unwrap();

        match err {
            StoreError::Sqlite(e) => assert_eq!(e.sqlite_error_code(), Some(ErrorCode::DatabaseBusy)),
            other => panic!("expected busy error, got {other:?}"),
        }
        // each attempt waits out the busy timeout before giving up
        assert!(elapsed >= std::time::Duration::from_millis(250) * (MAX_VOTE_TX_ATTEMPTS - 1));

        // nothing was written, and the vote goes through once the lock is gone
        assert_eq!(db.get_post(post).unwrap().score(), 0);
        assert_eq!(db.apply_vote(post, voter, VoteValue::Up).unwrap().score(), 1);
    }

    #[test]
    fn missing_post_is_not_found() {
        let (mut db, _, author) = setup();
        assert!(matches!(
            db.apply_vote(PostId::new(), author, VoteValue::Up),
            Err(StoreError::NotFound)
        ));
    }
}
