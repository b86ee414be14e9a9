use rusqlite::{Connection, params};
use eyre::WrapErr;
use color_eyre::Result;
use super::entities::*;
use super::mappers::{
  map_faq, map_subscriber, map_testimonial,
  FAQ_FIELDS, SUBSCRIBER_FIELDS, TESTIMONIAL_FIELDS
};
use super::{select_many, select_one};
use crate::utils::time_utils::current_timestamp;

// Flat records with no relations: testimonials, FAQ entries
// and newsletter subscribers.

/* --- Testimonials --- */

pub fn approved_testimonials(conn: &Connection) -> Result<Vec<Testimonial>> {
  select_many(
    conn,
    &format!(
      "SELECT {} FROM testimonials WHERE approved = 1 ORDER BY created_at DESC, id DESC",
      TESTIMONIAL_FIELDS
    ),
    [],
    map_testimonial
  )
}

pub fn insert_testimonial(
  conn: &Connection,
  author_name: &str,
  author_role: Option<&str>,
  content: &str,
  rating: Option<i32>,
  approved: bool
) -> Result<i64> {
  conn.execute(
    "INSERT INTO testimonials (author_name, author_role, content, rating, approved, created_at) \
    VALUES (?, ?, ?, ?, ?, ?)",
    params![author_name, author_role, content, rating, approved, current_timestamp()]
  ).context("Inserting testimonial")?;
  Ok(conn.last_insert_rowid())
}

pub fn approve_testimonial(conn: &Connection, id: i64) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE testimonials SET approved = 1 WHERE id = ?",
    params![id]
  ).context("Approving testimonial")?;
  Ok(updated > 0)
}

pub fn delete_testimonial(conn: &Connection, id: i64) -> Result<bool> {
  let deleted = conn.execute("DELETE FROM testimonials WHERE id = ?", params![id])
    .context("Deleting testimonial")?;
  Ok(deleted > 0)
}

/* --- FAQ --- */

pub fn published_faqs(conn: &Connection) -> Result<Vec<Faq>> {
  select_many(
    conn,
    &format!(
      "SELECT {} FROM faqs WHERE published = 1 ORDER BY position ASC, id ASC",
      FAQ_FIELDS
    ),
    [],
    map_faq
  )
}

pub fn insert_faq(conn: &Connection, faq: &Faq) -> Result<i64> {
  conn.execute(
    "INSERT INTO faqs (question, answer, position, published) VALUES (?, ?, ?, ?)",
    params![faq.question, faq.answer, faq.position, faq.published]
  ).context("Inserting FAQ entry")?;
  Ok(conn.last_insert_rowid())
}

pub fn update_faq(conn: &Connection, faq: &Faq) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE faqs SET question = ?, answer = ?, position = ?, published = ? WHERE id = ?",
    params![faq.question, faq.answer, faq.position, faq.published, faq.id]
  ).context("Updating FAQ entry")?;
  Ok(updated > 0)
}

pub fn delete_faq(conn: &Connection, id: i64) -> Result<bool> {
  let deleted = conn.execute("DELETE FROM faqs WHERE id = ?", params![id])
    .context("Deleting FAQ entry")?;
  Ok(deleted > 0)
}

/* --- Newsletter subscribers --- */

pub fn subscriber_by_email(conn: &Connection, email: &str) -> Result<Option<Subscriber>> {
  select_one(
    conn,
    &format!("SELECT {} FROM subscribers WHERE email = ?", SUBSCRIBER_FIELDS),
    params![email],
    map_subscriber
  )
}

pub fn insert_subscriber(
  conn: &Connection,
  email: &str,
  name: Option<&str>,
  token: &str
) -> Result<i64> {
  conn.execute(
    "INSERT INTO subscribers (email, name, token, active, created_at) VALUES (?, ?, ?, 1, ?)",
    params![email, name, token, current_timestamp()]
  ).context("Inserting subscriber")?;
  Ok(conn.last_insert_rowid())
}

// Subscribing again with a known email turns it back on.
pub fn reactivate_subscriber(conn: &Connection, id: i64, name: Option<&str>) -> Result<()> {
  conn.execute(
    "UPDATE subscribers SET active = 1, name = COALESCE(?, name) WHERE id = ?",
    params![name, id]
  ).context("Reactivating subscriber")?;
  Ok(())
}

// False when the token is unknown or already unsubscribed.
pub fn deactivate_subscriber_by_token(conn: &Connection, token: &str) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE subscribers SET active = 0 WHERE token = ? AND active = 1",
    params![token]
  ).context("Unsubscribing")?;
  Ok(updated > 0)
}

pub fn active_subscribers(conn: &Connection) -> Result<Vec<Subscriber>> {
  select_many(
    conn,
    &format!(
      "SELECT {} FROM subscribers WHERE active = 1 ORDER BY created_at DESC, id DESC",
      SUBSCRIBER_FIELDS
    ),
    [],
    map_subscriber
  )
}
