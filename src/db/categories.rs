use rusqlite::{Connection, params};
use eyre::WrapErr;
use color_eyre::Result;
use super::entities::*;
use super::mappers::{map_category, CATEGORY_FIELDS};
use super::{select_count, select_many, select_one};
use crate::utils::time_utils::current_timestamp;

pub struct CategoryInput {
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub parent_id: Option<i64>,
  pub subtopics: Vec<String>
}

fn subtopics_json(subtopics: &[String]) -> Result<String> {
  serde_json::to_string(subtopics).context("Serializing sub-topics")
}

pub fn all_categories(conn: &Connection) -> Result<Vec<Category>> {
  select_many(
    conn,
    &format!("SELECT {} FROM categories ORDER BY name ASC", CATEGORY_FIELDS),
    [],
    map_category
  )
}

pub fn category_by_id(conn: &Connection, id: i64) -> Result<Option<Category>> {
  select_one(
    conn,
    &format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_FIELDS),
    params![id],
    map_category
  )
}

// Names are unique regardless of case.
pub fn category_name_taken(
  conn: &Connection,
  name: &str,
  exclude_id: Option<i64>
) -> Result<bool> {
  let count = select_count(
    conn,
    "SELECT count(*) FROM categories WHERE lower(name) = lower(?) AND id != ?",
    params![name, exclude_id.unwrap_or(-1)]
  )?;
  Ok(count > 0)
}

pub fn category_slug_taken(
  conn: &Connection,
  slug: &str,
  exclude_id: Option<i64>
) -> Result<bool> {
  let count = select_count(
    conn,
    "SELECT count(*) FROM categories WHERE slug = ? AND id != ?",
    params![slug, exclude_id.unwrap_or(-1)]
  )?;
  Ok(count > 0)
}

pub fn insert_category(conn: &Connection, input: &CategoryInput) -> Result<i64> {
  conn.execute(
    "INSERT INTO categories (name, slug, description, parent_id, subtopics, created_at) \
    VALUES (?, ?, ?, ?, ?, ?)",
    params![
      input.name,
      input.slug,
      input.description,
      input.parent_id,
      subtopics_json(&input.subtopics)?,
      current_timestamp()
    ]
  ).context("Inserting category")?;
  Ok(conn.last_insert_rowid())
}

// Full replacement of the editable fields.
pub fn update_category(conn: &Connection, id: i64, input: &CategoryInput) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE categories SET name = ?, slug = ?, description = ?, parent_id = ?, \
    subtopics = ? WHERE id = ?",
    params![
      input.name,
      input.slug,
      input.description,
      input.parent_id,
      subtopics_json(&input.subtopics)?,
      id
    ]
  ).context("Updating category")?;
  Ok(updated > 0)
}

// Posts of a deleted category end up without one (ON DELETE
// SET NULL), same for child categories.
pub fn delete_category(conn: &Connection, id: i64) -> Result<bool> {
  let deleted = conn.execute("DELETE FROM categories WHERE id = ?", params![id])
    .context("Deleting category")?;
  Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{fixtures, memory_pool, posts};

  fn input(name: &str) -> CategoryInput {
    CategoryInput {
      name: name.to_string(),
      slug: crate::utils::text_utils::slugify(name),
      description: None,
      parent_id: None,
      subtopics: vec!["Async".to_string(), "Traits".to_string()]
    }
  }

  #[test]
  fn subtopics_survive_the_round_trip() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let id = insert_category(&conn, &input("Programming")).unwrap();
    let category = category_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(category.slug, "programming");
    assert_eq!(category.subtopics, vec!["Async", "Traits"]);
  }

  #[test]
  fn name_uniqueness_is_case_insensitive() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let id = insert_category(&conn, &input("Travel")).unwrap();
    assert!(category_name_taken(&conn, "travel", None).unwrap());
    assert!(!category_name_taken(&conn, "TRAVEL", Some(id)).unwrap());
  }

  #[test]
  fn deleting_category_detaches_posts() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let id = insert_category(&conn, &input("Food")).unwrap();
    let post = fixtures::post(&conn, "Pasta", PostStatus::Published, None);
    posts::update_post(&conn, post, &PostUpdate {
      category_id: Some(Some(id)),
      ..Default::default()
    }).unwrap();
    assert!(delete_category(&conn, id).unwrap());
    let post = posts::post_by_id(&conn, post).unwrap().unwrap();
    assert_eq!(post.category_id, None);
    assert!(all_categories(&conn).unwrap().is_empty());
  }
}
