use rusqlite::{Connection, OptionalExtension, Params, Row};
use r2d2_sqlite::SqliteConnectionManager;
use eyre::WrapErr;
use color_eyre::Result;
use std::time::Duration;
pub mod entities;
pub mod helpers;
pub mod mappers;
pub mod queries;
pub mod posts;
pub mod comments;
pub mod categories;
pub mod tags;
pub mod ratings;
pub mod users;
pub mod notifications;
pub mod site_content;
pub mod analytics;
pub use queries::Order;

// Type alias to make function signatures much clearer:
pub type Pool = r2d2::Pool<SqliteConnectionManager>;

const SCHEMA: &'static str = include_str!("schema.sql");

/**
 * Everything in here is synchronous and takes a plain
 * Connection, so the same functions work on a pooled
 * connection or inside a Transaction (which derefs to
 * Connection).
 */

// Runs for every new connection the pool opens. The schema
// only uses "IF NOT EXISTS" so it's fine to run it again.
fn init_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
  conn.busy_timeout(Duration::from_secs(5))?;
  conn.execute_batch(SCHEMA)
}

pub fn open_pool(db_path: &str) -> Result<Pool> {
  let manager = SqliteConnectionManager::file(db_path)
    .with_init(init_connection);
  Pool::new(manager)
    .context("Opening the database connection pool")
}

// Every in-memory connection is its own database, so tests
// get a pool of exactly one connection.
#[cfg(test)]
pub fn memory_pool() -> Pool {
  let manager = SqliteConnectionManager::memory()
    .with_init(init_connection);
  Pool::builder()
    .max_size(1)
    .build(manager)
    .expect("In-memory database")
}

// Signature shamelessly taken from the rusqlite docs.
pub fn select_many<T, P, F>(
  conn: &Connection,
  query: &str,
  params: P,
  mapper: F
) -> Result<Vec<T>>
  where
    P: Params,
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  let mut stmt = conn.prepare(query)?;
  stmt.query_map(params, mapper)
    .and_then(Iterator::collect)
    .context("Generic select_many query")
}

pub fn select_one<T, P, F>(
  conn: &Connection,
  query: &str,
  params: P,
  mapper: F
) -> Result<Option<T>>
  where
    P: Params,
    F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  conn.query_row(query, params, mapper)
    .optional()
    .context("Generic select_one query")
}

pub fn select_count<P: Params>(
  conn: &Connection,
  query: &str,
  params: P
) -> Result<usize> {
  let count: i64 = conn.query_row(query, params, |row| row.get(0))
    .context("Generic count query")?;
  // count(*) is never negative.
  Ok(count.max(0) as usize)
}

#[cfg(test)]
pub mod fixtures {
  // Shared by the tests of all the modules that need rows
  // to exist first.
  use super::*;
  use super::entities::*;
  use rusqlite::params;

  pub fn user(conn: &Connection, name: &str, role: UserRole) -> i64 {
    conn.execute(
      "INSERT INTO users (name, email, role, created_at) VALUES (?, ?, ?, 0)",
      params![name, format!("{}@example.com", name.to_lowercase()), role]
    ).unwrap();
    conn.last_insert_rowid()
  }

  pub fn post(conn: &Connection, title: &str, status: PostStatus, author_id: Option<i64>) -> i64 {
    let new_post = NewPost {
      title: title.to_string(),
      slug: crate::utils::text_utils::slugify(title),
      content: format!("<p>{}</p>", title),
      excerpt: title.to_string(),
      status,
      author_id,
      category_id: None,
      featured_image: None,
      seo: SeoFields::default(),
      scheduled_at: None,
      tag_ids: Vec::new()
    };
    posts::insert_post(conn, &new_post).unwrap()
  }

  pub fn comment(
    conn: &Connection,
    post_id: i64,
    parent_id: Option<i64>,
    status: CommentStatus,
    rating: Option<i32>,
    created_at: i64
  ) -> i64 {
    conn.execute(
      "INSERT INTO comments (post_id, parent_id, author_name, author_email, \
      content, status, rating, created_at) VALUES (?, ?, 'Guest', \
      'guest@example.com', 'Hello', ?, ?, ?)",
      params![post_id, parent_id, status, rating, created_at]
    ).unwrap();
    conn.last_insert_rowid()
  }
}
