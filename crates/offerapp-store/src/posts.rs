//! Post records, the paginated feed query and the age-based expiry sweep.

use chrono::{DateTime, Duration, Utc};
use offerapp_shared::constants::POST_MAX_AGE_DAYS;
use offerapp_shared::{
    Author, Category, FeedQuery, NewPost, PageCursor, Post, PostDetails, PostId, PostStatus,
    SortOption, StatusFilter, UserId,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::cursor::{self, Keyset, SortKey};
use crate::database::{fmt_ts, parse_label, parse_ts, parse_uuid, Database};
use crate::error::{not_found, Result, StoreError};
use crate::models::Page;
use crate::votes::votes_for_post;

const SELECT_POST: &str = "SELECT p.id, p.author_id, u.username, u.profile_image_url,
        p.description, p.price, p.discount_price, p.category, p.store,
        p.location, p.latitude, p.longitude, p.image_url, p.status, p.created_at
     FROM posts p JOIN users u ON u.uid = p.author_id";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Publish a validated post for `author` with an already uploaded image.
    pub fn create_post(&self, author: UserId, post: NewPost, image_url: &str) -> Result<Post> {
        let post = post.validated()?;
        let author = self.get_user(author)?.summary();

        let record = Post {
            id: PostId::new(),
            description: post.details.description,
            price: post.details.price,
            discount_price: post.details.discount_price,
            category: post.details.category,
            store: post.details.store,
            location: post.location,
            latitude: post.latitude,
            longitude: post.longitude,
            image_url: image_url.to_string(),
            author,
            created_at: Utc::now(),
            status: PostStatus::Active,
            votes: Vec::new(),
        };
        self.insert_post(&record)?;

        tracing::info!(post = %record.id, author = %record.author.uid, "post created");
        Ok(record)
    }

    /// Raw insert of a fully formed post (votes are not written).
    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.conn().execute(
            "INSERT INTO posts (id, author_id, description, price, discount_price, category,
                                store, location, latitude, longitude, image_url, status,
                                score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13)",
            params![
                post.id.to_string(),
                post.author.uid.to_string(),
                post.description,
                post.price,
                post.discount_price,
                post.category.label(),
                post.store,
                post.location,
                post.latitude,
                post.longitude,
                post.image_url,
                post.status.as_str(),
                fmt_ts(&post.created_at),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_post(&self, id: PostId) -> Result<Post> {
        load_post(self.conn(), id)
    }

    /// One page of the feed, strictly after `cursor` in `query.sort` order.
    pub fn fetch_posts_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&PageCursor>,
        limit: u32,
    ) -> Result<Page> {
        let limit = limit.max(1);
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if query.category != Category::All {
            clauses.push("p.category = ?");
            args.push(Value::Text(query.category.label().to_string()));
        }
        if let StatusFilter::Only(status) = query.status {
            clauses.push("p.status = ?");
            args.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(cursor) = cursor {
            let keyset = cursor::decode(cursor, query.sort)?;
            let (clause, key) = keyset_clause(&keyset);
            clauses.push(clause);
            args.push(key.clone());
            args.push(key);
            args.push(Value::Text(keyset.id.to_string()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let order_sql = match query.sort {
            SortOption::Newest => "p.created_at DESC, p.id DESC",
            SortOption::PriceAsc => "p.price ASC, p.id ASC",
            SortOption::PriceDesc => "p.price DESC, p.id DESC",
            SortOption::Score => "p.score DESC, p.id DESC",
        };
        // one extra row tells us whether another page exists
        args.push(Value::Integer(i64::from(limit) + 1));

        let sql = format!("{SELECT_POST}{where_sql} ORDER BY {order_sql} LIMIT ?");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            let mut post = row?;
            post.votes = votes_for_post(self.conn(), post.id)?;
            posts.push(post);
        }

        let next_cursor = if posts.len() > limit as usize {
            posts.truncate(limit as usize);
            match posts.last() {
                Some(last) => Some(cursor::encode(&Keyset::after(query.sort, last))?),
                None => None,
            }
        } else {
            None
        };

        tracing::debug!(
            category = %query.category,
            sort = ?query.sort,
            returned = posts.len(),
            has_more = next_cursor.is_some(),
            "fetched feed page"
        );

        Ok(Page { posts, next_cursor })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    pub fn update_post_details(&self, id: PostId, details: PostDetails) -> Result<Post> {
        let details = details.validated()?;
        let affected = self.conn().execute(
            "UPDATE posts
             SET description = ?1, price = ?2, discount_price = ?3, category = ?4, store = ?5
             WHERE id = ?6",
            params![
                details.description,
                details.price,
                details.discount_price,
                details.category.label(),
                details.store,
                id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_post(id)
    }

    /// Set the status directly. Expired posts stay expired.
    pub fn update_post_status(&self, id: PostId, status: PostStatus) -> Result<()> {
        let current: String = self
            .conn()
            .query_row(
                "SELECT status FROM posts WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(not_found)?;

        if current == PostStatus::Expired.as_str() && status == PostStatus::Active {
            return Err(StoreError::InvalidTransition {
                from: current,
                to: status.to_string(),
            });
        }

        self.conn().execute(
            "UPDATE posts SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )?;
        Ok(())
    }

    /// Flip every active post created before `now - 30 days` to expired.
    /// Returns how many posts changed.
    pub fn expire_old_posts(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::days(POST_MAX_AGE_DAYS);
        let affected = self.conn().execute(
            "UPDATE posts SET status = ?1 WHERE status = ?2 AND created_at < ?3",
            params![
                PostStatus::Expired.as_str(),
                PostStatus::Active.as_str(),
                fmt_ts(&cutoff),
            ],
        )?;
        if affected > 0 {
            tracing::info!(expired = affected, cutoff = %cutoff, "expired stale posts");
        }
        Ok(affected)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    // ON DELETE CASCADE: comments, votes and favourite links go with it
    pub fn delete_post(&self, id: PostId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id.to_string()])?;
        if affected > 0 {
            tracing::info!(post = %id, "post deleted");
        }
        Ok(affected > 0)
    }
}

/// `(clause, sort key value)` for rows strictly after `keyset`.
fn keyset_clause(keyset: &Keyset) -> (&'static str, Value) {
    let clause = match keyset.sort {
        SortOption::Newest => "(p.created_at < ? OR (p.created_at = ? AND p.id < ?))",
        SortOption::PriceAsc => "(p.price > ? OR (p.price = ? AND p.id > ?))",
        SortOption::PriceDesc => "(p.price < ? OR (p.price = ? AND p.id < ?))",
        SortOption::Score => "(p.score < ? OR (p.score = ? AND p.id < ?))",
    };
    let value = match &keyset.key {
        SortKey::CreatedAt(ts) => Value::Text(ts.clone()),
        SortKey::Price(p) => Value::Real(*p),
        SortKey::Score(s) => Value::Integer(*s),
    };
    (clause, value)
}

pub(crate) fn load_post(conn: &Connection, id: PostId) -> Result<Post> {
    let mut post = conn
        .query_row(
            &format!("{SELECT_POST} WHERE p.id = ?1"),
            params![id.to_string()],
            row_to_post,
        )
        .map_err(not_found)?;
    post.votes = votes_for_post(conn, id)?;
    Ok(post)
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let id: String = row.get(0)?;
    let author_id: String = row.get(1)?;
    let category: String = row.get(7)?;
    let status: String = row.get(13)?;
    let created_at: String = row.get(14)?;

    Ok(Post {
        id: PostId(parse_uuid(0, &id)?),
        author: Author {
            uid: UserId(parse_uuid(1, &author_id)?),
            username: row.get(2)?,
            profile_image_url: row.get(3)?,
        },
        description: row.get(4)?,
        price: row.get(5)?,
        discount_price: row.get(6)?,
        category: parse_label(7, &category)?,
        store: row.get(8)?,
        location: row.get(9)?,
        latitude: row.get(10)?,
        longitude: row.get(11)?,
        image_url: row.get(12)?,
        status: parse_label(13, &status)?,
        created_at: parse_ts(14, &created_at)?,
        votes: Vec::new(),
    })
}
