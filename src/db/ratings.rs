use rusqlite::{Connection, params};
use eyre::WrapErr;
use color_eyre::Result;
use super::entities::*;
use super::mappers::{map_rating, RATING_FIELDS};
use super::{select_count, select_many, select_one};
use crate::utils::time_utils::current_timestamp;

// One row per (user, post): a second rating overwrites the
// value of the first one.
pub fn upsert_rating(
  conn: &Connection,
  user_id: i64,
  post_id: i64,
  value: i32
) -> Result<Rating> {
  let now = current_timestamp();
  conn.execute(
    "INSERT INTO ratings (post_id, user_id, value, created_at, updated_at) \
    VALUES (?1, ?2, ?3, ?4, ?4) \
    ON CONFLICT (post_id, user_id) \
    DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    params![post_id, user_id, value, now]
  ).context("Upserting rating")?;
  rating_for(conn, user_id, post_id)?
    .ok_or_else(|| eyre::eyre!("Rating vanished right after upsert"))
}

pub fn rating_for(conn: &Connection, user_id: i64, post_id: i64) -> Result<Option<Rating>> {
  select_one(
    conn,
    &format!(
      "SELECT {} FROM ratings WHERE user_id = ? AND post_id = ?",
      RATING_FIELDS
    ),
    params![user_id, post_id],
    map_rating
  )
}

#[cfg(test)]
pub fn count_ratings_for_post(conn: &Connection, post_id: i64) -> Result<usize> {
  select_count(
    conn,
    "SELECT count(*) FROM ratings WHERE post_id = ?",
    params![post_id]
  )
}

/**
 * Every rating value that counts toward a post's average:
 * the dedicated rating rows, plus the ratings carried by
 * approved comments. A user's dedicated rating replaces the
 * rated comments that same user left on the post.
 */
pub fn rating_values_for_post(conn: &Connection, post_id: i64) -> Result<Vec<i32>> {
  select_many(
    conn,
    "SELECT value FROM ratings WHERE post_id = ?1 \
    UNION ALL \
    SELECT c.rating FROM comments c \
    WHERE c.post_id = ?1 AND c.status = ?2 AND c.rating IS NOT NULL \
    AND (c.user_id IS NULL OR NOT EXISTS ( \
      SELECT 1 FROM ratings r WHERE r.post_id = c.post_id AND r.user_id = c.user_id \
    ))",
    params![post_id, CommentStatus::Approved],
    |row| row.get(0)
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{fixtures, memory_pool};

  #[test]
  fn second_rating_overwrites_first() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let user = fixtures::user(&conn, "Bob", UserRole::Reader);
    let post = fixtures::post(&conn, "Post", PostStatus::Published, None);
    let first = upsert_rating(&conn, user, post, 2).unwrap();
    let second = upsert_rating(&conn, user, post, 5).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.value, 5);
    assert_eq!(count_ratings_for_post(&conn, post).unwrap(), 1);
  }

  #[test]
  fn values_merge_both_sources() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let user = fixtures::user(&conn, "Bob", UserRole::Reader);
    let post = fixtures::post(&conn, "Post", PostStatus::Published, None);
    fixtures::comment(&conn, post, None, CommentStatus::Approved, Some(3), 1);
    fixtures::comment(&conn, post, None, CommentStatus::Pending, Some(1), 2);
    fixtures::comment(&conn, post, None, CommentStatus::Approved, None, 3);
    upsert_rating(&conn, user, post, 5).unwrap();
    let mut values = rating_values_for_post(&conn, post).unwrap();
    values.sort();
    assert_eq!(values, vec![3, 5]);
  }

  #[test]
  fn dedicated_rating_supersedes_own_rated_comment() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let user = fixtures::user(&conn, "Bob", UserRole::Reader);
    let post = fixtures::post(&conn, "Post", PostStatus::Published, None);
    let comment = fixtures::comment(&conn, post, None, CommentStatus::Approved, Some(1), 1);
    conn.execute("UPDATE comments SET user_id = ? WHERE id = ?", params![user, comment])
      .unwrap();
    assert_eq!(rating_values_for_post(&conn, post).unwrap(), vec![1]);
    upsert_rating(&conn, user, post, 4).unwrap();
    assert_eq!(rating_values_for_post(&conn, post).unwrap(), vec![4]);
  }
}
