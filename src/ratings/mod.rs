/*
 * Post rating aggregation.
 *
 * Ratings come from two places: comments carrying a rating
 * (guests can leave those) and the per-user rating rows.
 * Both feed the same aggregate, fully recomputed after every
 * write that can change it, in the transaction of that write.
 */

use rusqlite::{Connection, TransactionBehavior};
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, info};
use crate::db::entities::Rating;
use crate::db::{posts, ratings};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

pub fn is_valid_rating(value: i32) -> bool {
  (MIN_RATING..=MAX_RATING).contains(&value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
  pub average: f64,
  pub count: i64
}

impl RatingSummary {

  // Mean rounded to one decimal place. No values is 0.0.
  pub fn from_values(values: &[i32]) -> Self {
    if values.is_empty() {
      return Self { average: 0.0, count: 0 };
    }
    let total: i64 = values.iter().map(|v| i64::from(*v)).sum();
    let count = values.len() as i64;
    Self {
      average: round_one_decimal(total as f64 / count as f64),
      count
    }
  }

}

pub fn round_one_decimal(value: f64) -> f64 {
  (value * 10.0).round() / 10.0
}

/**
 * Recompute and store the rating of a post. Meant to be
 * called inside the transaction that changed a rating
 * source, the Transaction derefs to a Connection.
 */
pub fn recompute_post_rating(conn: &Connection, post_id: i64) -> Result<RatingSummary> {
  let values = ratings::rating_values_for_post(conn, post_id)?;
  let summary = RatingSummary::from_values(&values);
  posts::update_post_rating(conn, post_id, summary.average, summary.count)?;
  debug!(
    "Post {} rating is now {} over {} ratings",
    post_id, summary.average, summary.count
  );
  Ok(summary)
}

// Insert or overwrite the rating of a user for a post, then
// recompute. IMMEDIATE takes the write lock up front so two
// concurrent submissions can't interleave their recomputation.
pub fn submit_user_rating(
  conn: &mut Connection,
  user_id: i64,
  post_id: i64,
  value: i32
) -> Result<(Rating, RatingSummary)> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let rating = ratings::upsert_rating(&tx, user_id, post_id, value)?;
  let summary = recompute_post_rating(&tx, post_id)?;
  tx.commit().context("Committing user rating")?;
  Ok((rating, summary))
}

// Maintenance: rebuild every post aggregate. Returns the
// number of posts processed.
pub fn recompute_all(conn: &mut Connection) -> Result<usize> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let ids = posts::all_post_ids(&tx)?;
  for id in ids.iter() {
    recompute_post_rating(&tx, *id)?;
  }
  tx.commit().context("Committing rating recomputation")?;
  info!("Recomputed ratings for {} posts", ids.len());
  Ok(ids.len())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::entities::*;
  use crate::db::{fixtures, memory_pool};
  use rusqlite::params;

  #[test]
  fn summary_of_nothing_is_zero() {
    assert_eq!(
      RatingSummary::from_values(&[]),
      RatingSummary { average: 0.0, count: 0 }
    );
  }

  #[test]
  fn summary_is_rounded_to_one_decimal() {
    // 13 / 3 = 4.333...
    let summary = RatingSummary::from_values(&[4, 4, 5]);
    assert_eq!(summary.average, 4.3);
    assert_eq!(summary.count, 3);
    // 11 / 3 = 3.666...
    assert_eq!(RatingSummary::from_values(&[3, 3, 5]).average, 3.7);
    assert_eq!(RatingSummary::from_values(&[5]).average, 5.0);
  }

  #[test]
  fn rating_bounds() {
    assert!(is_valid_rating(1));
    assert!(is_valid_rating(5));
    assert!(!is_valid_rating(0));
    assert!(!is_valid_rating(6));
  }

  #[test]
  fn recompute_uses_approved_rated_comments_only() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let post = fixtures::post(&conn, "Post", PostStatus::Published, None);
    fixtures::comment(&conn, post, None, CommentStatus::Approved, Some(5), 1);
    fixtures::comment(&conn, post, None, CommentStatus::Approved, Some(2), 2);
    fixtures::comment(&conn, post, None, CommentStatus::Approved, Some(4), 3);
    fixtures::comment(&conn, post, None, CommentStatus::Pending, Some(1), 4);
    fixtures::comment(&conn, post, None, CommentStatus::Spam, Some(1), 5);
    fixtures::comment(&conn, post, None, CommentStatus::Approved, None, 6);

    let summary = recompute_post_rating(&conn, post).unwrap();
    assert_eq!(summary, RatingSummary { average: 3.7, count: 3 });
    let stored = posts::post_by_id(&conn, post).unwrap().unwrap();
    assert_eq!(stored.rating, 3.7);
    assert_eq!(stored.rating_count, 3);
  }

  #[test]
  fn submitting_twice_updates_the_same_row() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let user = fixtures::user(&conn, "Bob", UserRole::Reader);
    let post = fixtures::post(&conn, "Post", PostStatus::Published, None);

    let (first, summary) = submit_user_rating(&mut conn, user, post, 2).unwrap();
    assert_eq!(summary, RatingSummary { average: 2.0, count: 1 });
    let (second, summary) = submit_user_rating(&mut conn, user, post, 4).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(summary, RatingSummary { average: 4.0, count: 1 });
    assert_eq!(ratings::count_ratings_for_post(&conn, post).unwrap(), 1);
  }

  #[test]
  fn user_ratings_and_comment_ratings_share_the_aggregate() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let user = fixtures::user(&conn, "Bob", UserRole::Reader);
    let post = fixtures::post(&conn, "Post", PostStatus::Published, None);
    fixtures::comment(&conn, post, None, CommentStatus::Approved, Some(2), 1);
    let (_, summary) = submit_user_rating(&mut conn, user, post, 5).unwrap();
    assert_eq!(summary, RatingSummary { average: 3.5, count: 2 });
  }

  #[test]
  fn recompute_all_fixes_stale_aggregates() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let post = fixtures::post(&conn, "Post", PostStatus::Published, None);
    fixtures::comment(&conn, post, None, CommentStatus::Approved, Some(4), 1);
    conn.execute("UPDATE posts SET rating = 1.0, rating_count = 9", params![]).unwrap();
    assert_eq!(recompute_all(&mut conn).unwrap(), 1);
    let stored = posts::post_by_id(&conn, post).unwrap().unwrap();
    assert_eq!((stored.rating, stored.rating_count), (4.0, 1));
  }
}
