use rusqlite::{Connection, params};
use eyre::WrapErr;
use color_eyre::Result;
use super::entities::*;
use super::mappers::{map_comment, COMMENT_FIELDS};
use super::{select_count, select_many, select_one};

// Sets the id on the comment passed in.
pub fn insert_comment(conn: &Connection, comment: &mut Comment) -> Result<()> {
  conn.execute(
    "INSERT INTO comments (post_id, parent_id, user_id, author_name, \
    author_email, content, status, rating, client_ip, created_at) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    params![
      comment.post_id,
      comment.parent_id,
      comment.user_id,
      comment.author_name,
      comment.author_email,
      comment.content,
      comment.status,
      comment.rating,
      comment.client_ip,
      comment.created_at
    ]
  ).context("Inserting comment")?;
  comment.id = conn.last_insert_rowid();
  Ok(())
}

pub fn comment_by_id(conn: &Connection, id: i64) -> Result<Option<Comment>> {
  select_one(
    conn,
    &format!("SELECT {} FROM comments WHERE id = ?", COMMENT_FIELDS),
    params![id],
    map_comment
  )
}

// Oldest first, which is the order replies are displayed in.
pub fn approved_comments_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Comment>> {
  select_many(
    conn,
    &format!(
      "SELECT {} FROM comments WHERE post_id = ? AND status = ? \
      ORDER BY created_at ASC, id ASC",
      COMMENT_FIELDS
    ),
    params![post_id, CommentStatus::Approved],
    map_comment
  )
}

// Moderation queue, newest first.
pub fn comments_by_status(
  conn: &Connection,
  status: CommentStatus,
  start: usize,
  max: usize
) -> Result<Vec<Comment>> {
  select_many(
    conn,
    &format!(
      "SELECT {} FROM comments WHERE status = ? \
      ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
      COMMENT_FIELDS
    ),
    params![status, max as i64, start as i64],
    map_comment
  )
}

pub fn count_comments_by_status(conn: &Connection, status: CommentStatus) -> Result<usize> {
  select_count(
    conn,
    "SELECT count(*) FROM comments WHERE status = ?",
    params![status]
  )
}

pub fn set_comment_status(
  conn: &Connection,
  id: i64,
  status: CommentStatus
) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE comments SET status = ? WHERE id = ?",
    params![status, id]
  ).context("Updating comment status")?;
  Ok(updated > 0)
}

// Replies to a deleted comment are kept, they show up as
// root comments afterwards.
pub fn delete_comment(conn: &Connection, id: i64) -> Result<bool> {
  let deleted = conn.execute("DELETE FROM comments WHERE id = ?", params![id])
    .context("Deleting comment")?;
  Ok(deleted > 0)
}
