use rusqlite::{Connection, params};
use eyre::WrapErr;
use color_eyre::Result;
use super::entities::*;
use super::mappers::{map_notification, NOTIFICATION_FIELDS};
use super::{select_count, select_many};
use crate::utils::time_utils::current_timestamp;

pub fn insert_notification(conn: &Connection, notification: &NewNotification) -> Result<i64> {
  conn.execute(
    "INSERT INTO notifications (recipient_id, kind, title, message, link, created_at) \
    VALUES (?, ?, ?, ?, ?, ?)",
    params![
      notification.recipient_id,
      notification.kind,
      notification.title,
      notification.message,
      notification.link,
      current_timestamp()
    ]
  ).context("Inserting notification")?;
  Ok(conn.last_insert_rowid())
}

pub fn notifications_for(
  conn: &Connection,
  recipient_id: i64,
  unread_only: bool,
  max: usize
) -> Result<Vec<Notification>> {
  select_many(
    conn,
    &format!(
      "SELECT {} FROM notifications WHERE recipient_id = ? \
      AND (? = 0 OR is_read = 0) ORDER BY created_at DESC, id DESC LIMIT ?",
      NOTIFICATION_FIELDS
    ),
    params![recipient_id, unread_only, max as i64],
    map_notification
  )
}

pub fn unread_count(conn: &Connection, recipient_id: i64) -> Result<usize> {
  select_count(
    conn,
    "SELECT count(*) FROM notifications WHERE recipient_id = ? AND is_read = 0",
    params![recipient_id]
  )
}

// The recipient check makes sure users can only touch their
// own notifications. False when nothing matched.
pub fn mark_read(conn: &Connection, id: i64, recipient_id: i64) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE notifications SET is_read = 1 WHERE id = ? AND recipient_id = ?",
    params![id, recipient_id]
  ).context("Marking notification as read")?;
  Ok(updated > 0)
}

pub fn mark_all_read(conn: &Connection, recipient_id: i64) -> Result<usize> {
  conn.execute(
    "UPDATE notifications SET is_read = 1 WHERE recipient_id = ? AND is_read = 0",
    params![recipient_id]
  ).context("Marking all notifications as read")
}
