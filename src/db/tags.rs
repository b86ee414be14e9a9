use rusqlite::{Connection, params, params_from_iter};
use eyre::WrapErr;
use color_eyre::Result;
use super::entities::*;
use super::helpers::generate_placeholders;
use super::mappers::{map_tag, TAG_FIELDS};
use super::{select_count, select_many};

pub fn all_tags(conn: &Connection) -> Result<Vec<Tag>> {
  select_many(
    conn,
    &format!("SELECT {} FROM tags ORDER BY name ASC", TAG_FIELDS),
    [],
    map_tag
  )
}

pub fn tag_slug_taken(conn: &Connection, slug: &str) -> Result<bool> {
  let count = select_count(
    conn,
    "SELECT count(*) FROM tags WHERE slug = ?",
    params![slug]
  )?;
  Ok(count > 0)
}

pub fn tag_name_taken(conn: &Connection, name: &str) -> Result<bool> {
  let count = select_count(
    conn,
    "SELECT count(*) FROM tags WHERE lower(name) = lower(?)",
    params![name]
  )?;
  Ok(count > 0)
}

pub fn insert_tag(conn: &Connection, name: &str, slug: &str) -> Result<i64> {
  conn.execute(
    "INSERT INTO tags (name, slug) VALUES (?, ?)",
    params![name, slug]
  ).context("Inserting tag")?;
  Ok(conn.last_insert_rowid())
}

pub fn delete_tag(conn: &Connection, id: i64) -> Result<bool> {
  let deleted = conn.execute("DELETE FROM tags WHERE id = ?", params![id])
    .context("Deleting tag")?;
  Ok(deleted > 0)
}

// Returns the ids from the list that don't exist.
pub fn missing_tag_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<i64>> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }
  let existing: Vec<i64> = select_many(
    conn,
    &format!(
      "SELECT id FROM tags WHERE id IN ({})",
      generate_placeholders(ids.len())
    ),
    params_from_iter(ids.iter()),
    |row| row.get(0)
  )?;
  Ok(ids.iter().filter(|id| !existing.contains(id)).copied().collect())
}
