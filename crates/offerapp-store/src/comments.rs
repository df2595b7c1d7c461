//! Comments on posts.

use chrono::Utc;
use offerapp_shared::{Author, Comment, CommentId, PostId, UserId, ValidationError};
use rusqlite::params;

use crate::database::{fmt_ts, parse_ts, parse_uuid, Database};
use crate::error::{not_found, Result, StoreError};

const SELECT_COMMENT: &str = "SELECT c.id, c.post_id, c.author_id, u.username, u.profile_image_url,
        c.text, c.created_at
     FROM comments c JOIN users u ON u.uid = c.author_id";

impl Database {
    pub fn add_comment(&self, post_id: PostId, author: UserId, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }
        self.conn()
            .query_row(
                "SELECT 1 FROM posts WHERE id = ?1",
                params![post_id.to_string()],
                |_| Ok(()),
            )
            .map_err(not_found)?;
        let author = self.get_user(author)?.summary();

        let comment = Comment {
            id: CommentId::new(),
            post_id,
            author,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.conn().execute(
            "INSERT INTO comments (id, post_id, author_id, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id.to_string(),
                post_id.to_string(),
                comment.author.uid.to_string(),
                comment.text,
                fmt_ts(&comment.created_at),
            ],
        )?;

        tracing::debug!(comment = %comment.id, post = %post_id, "comment added");
        Ok(comment)
    }

    /// Comments on a post, newest first.
    pub fn comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>> {
        self.query_comments("c.post_id", &post_id.to_string())
    }

    /// Everything `author` has written, newest first.
    pub fn comments_by_user(&self, author: UserId) -> Result<Vec<Comment>> {
        self.query_comments("c.author_id", &author.to_string())
    }

    fn query_comments(&self, column: &str, key: &str) -> Result<Vec<Comment>> {
        let sql = format!("{SELECT_COMMENT} WHERE {column} = ?1 ORDER BY c.created_at DESC, c.id DESC");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![key], row_to_comment)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let id: String = row.get(0)?;
    let post_id: String = row.get(1)?;
    let author_id: String = row.get(2)?;
    let created_at: String = row.get(6)?;

    Ok(Comment {
        id: CommentId(parse_uuid(0, &id)?),
        post_id: PostId(parse_uuid(1, &post_id)?),
        author: Author {
            uid: UserId(parse_uuid(2, &author_id)?),
            username: row.get(3)?,
            profile_image_url: row.get(4)?,
        },
        text: row.get(5)?,
        created_at: parse_ts(6, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use offerapp_shared::{Category, NewPost, PostDetails};

    use super::*;

    fn setup() -> (Database, PostId, UserId) {
        let db = Database::open_in_memory().unwrap();
        let author = db.create_user("ana", "ana@example.com").unwrap().uid;
        let post = db
            .create_post(
                author,
                NewPost {
                    details: PostDetails {
                        description: "Yerba".into(),
                        price: 10.0,
                        discount_price: 8.0,
                        category: Category::Food,
                        store: "Almacén".into(),
                    },
                    location: "Centro".into(),
                    latitude: 0.0,
                    longitude: 0.0,
                },
                "file:///yerba",
            )
            .unwrap();
        (db, post.id, author)
    }

    #[test]
    fn newest_comment_comes_first() {
        let (db, post, author) = setup();
        let first = db.add_comment(post, author, "primero").unwrap();
        db.conn()
            .execute(
                "UPDATE comments SET created_at = ?1 WHERE id = ?2",
                params![
                    fmt_ts(&(first.created_at - chrono::Duration::minutes(5))),
                    first.id.to_string()
                ],
            )
            .unwrap();
        let second = db.add_comment(post, author, "  segundo ").unwrap();
        assert_eq!(second.text, "segundo");

        let listed = db.comments_for_post(post).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(listed[0].author.username, "ana");

        assert_eq!(db.comments_by_user(author).unwrap().len(), 2);
    }

    #[test]
    fn blank_comment_is_rejected() {
        let (db, post, author) = setup();
        assert!(matches!(
            db.add_comment(post, author, "   "),
            Err(StoreError::Validation(ValidationError::EmptyComment))
        ));
    }

    #[test]
    fn comment_on_missing_post_is_not_found() {
        let (db, _, author) = setup();
        assert!(matches!(
            db.add_comment(PostId::new(), author, "hola"),
            Err(StoreError::NotFound)
        ));
    }
}
