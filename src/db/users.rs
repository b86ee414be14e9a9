use rusqlite::{Connection, params};
use eyre::WrapErr;
use color_eyre::Result;
use super::entities::*;
use super::mappers::{map_user, USER_FIELDS};
use super::select_one;
use crate::utils::time_utils::current_timestamp;

// Only the hash of the API token is stored.
pub fn insert_user(
  conn: &Connection,
  name: &str,
  email: &str,
  role: UserRole,
  api_token_hash: &str
) -> Result<i64> {
  conn.execute(
    "INSERT INTO users (name, email, role, api_token_hash, created_at) \
    VALUES (?, ?, ?, ?, ?)",
    params![name, email, role, api_token_hash, current_timestamp()]
  ).context("Inserting user")?;
  Ok(conn.last_insert_rowid())
}

pub fn user_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
  select_one(
    conn,
    &format!("SELECT {} FROM users WHERE id = ?", USER_FIELDS),
    params![id],
    map_user
  )
}

pub fn user_by_token_hash(conn: &Connection, token_hash: &str) -> Result<Option<User>> {
  select_one(
    conn,
    &format!("SELECT {} FROM users WHERE api_token_hash = ?", USER_FIELDS),
    params![token_hash],
    map_user
  )
}
