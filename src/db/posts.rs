use rusqlite::{Connection, params, params_from_iter};
use rusqlite::types::Value;
use eyre::WrapErr;
use color_eyre::Result;
use super::entities::*;
use super::mappers::{map_post, map_tag, post_fields, POST_FROM, TAG_FIELDS};
use super::queries::{Order, OrderBy, Query};
use super::{select_count, select_many, select_one};
use crate::utils::time_utils::current_timestamp;

const PUBLICATION_ORDER: &'static str = "COALESCE(posts.published_at, posts.created_at)";

// Optional filters for post listings.
#[derive(Debug, Default)]
pub struct PostFilter {
  pub status: Option<PostStatus>,
  pub category_slug: Option<String>,
  pub tag_slug: Option<String>
}

impl PostFilter {

  pub fn published() -> Self {
    Self {
      status: Some(PostStatus::Published),
      ..Default::default()
    }
  }

  // Adds the where clauses, params come out in the same
  // order.
  fn apply(&self, mut query: Query) -> (Query, Vec<Value>) {
    let mut values: Vec<Value> = Vec::new();
    if let Some(status) = &self.status {
      query = query.and_where("posts.status = ?");
      values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(category) = &self.category_slug {
      query = query.and_where("categories.slug = ?");
      values.push(Value::Text(category.clone()));
    }
    if let Some(tag) = &self.tag_slug {
      query = query.and_where(
        "posts.id IN (SELECT post_tags.post_id FROM post_tags \
        JOIN tags ON tags.id = post_tags.tag_id WHERE tags.slug = ?)"
      );
      values.push(Value::Text(tag.clone()));
    }
    (query, values)
  }

}

pub fn tags_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Tag>> {
  select_many(
    conn,
    &format!(
      "SELECT {} FROM post_tags JOIN tags ON tags.id = post_tags.tag_id \
      WHERE post_tags.post_id = ? ORDER BY tags.name ASC",
      TAG_FIELDS
    ),
    params![post_id],
    map_tag
  )
}

fn with_tags(conn: &Connection, post: Option<Post>) -> Result<Option<Post>> {
  match post {
    Some(mut p) => {
      p.tags = tags_for_post(conn, p.id)?;
      Ok(Some(p))
    },
    None => Ok(None)
  }
}

pub fn post_by_id(conn: &Connection, id: i64) -> Result<Option<Post>> {
  let query = Query::select(&post_fields(true), POST_FROM)
    .and_where("posts.id = ?");
  let post = select_one(conn, &query.to_string(), params![id], map_post)?;
  with_tags(conn, post)
}

pub fn post_by_slug(conn: &Connection, slug: &str) -> Result<Option<Post>> {
  let query = Query::select(&post_fields(true), POST_FROM)
    .and_where("posts.slug = ?");
  let post = select_one(conn, &query.to_string(), params![slug], map_post)?;
  with_tags(conn, post)
}

// A slug is taken when any other post uses it.
pub fn post_slug_taken(
  conn: &Connection,
  slug: &str,
  exclude_id: Option<i64>
) -> Result<bool> {
  let count = select_count(
    conn,
    "SELECT count(*) FROM posts WHERE slug = ? AND id != ?",
    params![slug, exclude_id.unwrap_or(-1)]
  )?;
  Ok(count > 0)
}

pub fn count_posts(conn: &Connection, filter: &PostFilter) -> Result<usize> {
  let (query, values) = filter.apply(Query::select(&["posts.id"], POST_FROM));
  select_count(conn, &query.to_count_string(), params_from_iter(values.iter()))
}

// Listings never include the content.
pub fn list_posts(
  conn: &Connection,
  filter: &PostFilter,
  start: usize,
  max: usize,
  order: Order
) -> Result<Vec<Post>> {
  let query = Query::select(&post_fields(false), POST_FROM);
  let (query, values) = filter.apply(query);
  let query = query
    .order(OrderBy::new(order, PUBLICATION_ORDER))
    .limit(max)
    .offset(start);
  let mut posts = select_many(
    conn,
    &query.to_string(),
    params_from_iter(values.iter()),
    map_post
  )?;
  for post in posts.iter_mut() {
    post.tags = tags_for_post(conn, post.id)?;
  }
  Ok(posts)
}

// Used by the feeds. Content is included.
pub fn published_posts_with_content(
  conn: &Connection,
  max: usize
) -> Result<Vec<Post>> {
  let (query, values) = PostFilter::published()
    .apply(Query::select(&post_fields(true), POST_FROM));
  let query = query
    .order(OrderBy::new(Order::Desc, PUBLICATION_ORDER))
    .limit(max);
  select_many(
    conn,
    &query.to_string(),
    params_from_iter(values.iter()),
    map_post
  )
}

pub fn all_post_ids(conn: &Connection) -> Result<Vec<i64>> {
  select_many(conn, "SELECT id FROM posts ORDER BY id ASC", [], |row| row.get(0))
}

fn set_post_tags(conn: &Connection, post_id: i64, tag_ids: &[i64]) -> Result<()> {
  conn.execute("DELETE FROM post_tags WHERE post_id = ?", params![post_id])?;
  let mut stmt = conn.prepare(
    "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)"
  )?;
  for tag_id in tag_ids {
    stmt.execute(params![post_id, tag_id])
      .context("Inserting post tag")?;
  }
  Ok(())
}

// Returns the id of the new post.
pub fn insert_post(conn: &Connection, post: &NewPost) -> Result<i64> {
  let now = current_timestamp();
  let published_at = match post.status {
    PostStatus::Published => Some(now),
    _ => None
  };
  conn.execute(
    "INSERT INTO posts (title, slug, content, excerpt, status, author_id, \
    category_id, featured_image, meta_title, meta_description, meta_keywords, \
    canonical_url, og_image, published_at, scheduled_at, created_at, updated_at) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    params![
      post.title,
      post.slug,
      post.content,
      post.excerpt,
      post.status,
      post.author_id,
      post.category_id,
      post.featured_image,
      post.seo.meta_title,
      post.seo.meta_description,
      post.seo.meta_keywords,
      post.seo.canonical_url,
      post.seo.og_image,
      published_at,
      post.scheduled_at,
      now,
      now
    ]
  ).context("Inserting post")?;
  let id = conn.last_insert_rowid();
  set_post_tags(conn, id, &post.tag_ids)?;
  Ok(id)
}

// Only the fields present in the update are touched. Returns
// false when the post doesn't exist.
pub fn update_post(conn: &Connection, id: i64, update: &PostUpdate) -> Result<bool> {
  let now = current_timestamp();
  let mut sets: Vec<&str> = vec!["updated_at = ?"];
  let mut values: Vec<Value> = vec![Value::Integer(now)];

  if let Some(title) = &update.title {
    sets.push("title = ?");
    values.push(Value::Text(title.clone()));
  }
  if let Some(slug) = &update.slug {
    sets.push("slug = ?");
    values.push(Value::Text(slug.clone()));
  }
  if let Some(content) = &update.content {
    sets.push("content = ?");
    values.push(Value::Text(content.clone()));
  }
  if let Some(excerpt) = &update.excerpt {
    sets.push("excerpt = ?");
    values.push(Value::Text(excerpt.clone()));
  }
  if let Some(status) = &update.status {
    sets.push("status = ?");
    values.push(Value::Text(status.as_str().to_string()));
    // First publication wins, republishing keeps the date.
    if *status == PostStatus::Published {
      sets.push("published_at = COALESCE(published_at, ?)");
      values.push(Value::Integer(now));
    }
  }
  if let Some(category_id) = &update.category_id {
    sets.push("category_id = ?");
    values.push(category_id.map(Value::Integer).unwrap_or(Value::Null));
  }
  if let Some(featured_image) = &update.featured_image {
    sets.push("featured_image = ?");
    values.push(featured_image.clone().map(Value::Text).unwrap_or(Value::Null));
  }
  if let Some(scheduled_at) = &update.scheduled_at {
    sets.push("scheduled_at = ?");
    values.push(scheduled_at.map(Value::Integer).unwrap_or(Value::Null));
  }
  let seo = &update.seo;
  let seo_values = [
    ("meta_title = ?", &seo.meta_title),
    ("meta_description = ?", &seo.meta_description),
    ("meta_keywords = ?", &seo.meta_keywords),
    ("canonical_url = ?", &seo.canonical_url),
    ("og_image = ?", &seo.og_image)
  ];
  for (set, value) in seo_values {
    if let Some(value) = value {
      sets.push(set);
      values.push(value.clone().map(Value::Text).unwrap_or(Value::Null));
    }
  }
  values.push(Value::Integer(id));

  let updated = conn.execute(
    &format!("UPDATE posts SET {} WHERE id = ?", sets.join(", ")),
    params_from_iter(values.iter())
  ).context("Updating post")?;
  if updated == 0 {
    return Ok(false);
  }
  if let Some(tag_ids) = &update.tag_ids {
    set_post_tags(conn, id, tag_ids)?;
  }
  Ok(true)
}

pub fn delete_post(conn: &Connection, id: i64) -> Result<bool> {
  let deleted = conn.execute("DELETE FROM posts WHERE id = ?", params![id])
    .context("Deleting post")?;
  Ok(deleted > 0)
}

// Single statement, so concurrent readers can't lose
// increments.
pub fn increment_view_count(conn: &Connection, id: i64) -> Result<()> {
  conn.execute(
    "UPDATE posts SET view_count = view_count + 1 WHERE id = ?",
    params![id]
  ).context("Incrementing view count")?;
  Ok(())
}

pub fn update_post_rating(
  conn: &Connection,
  post_id: i64,
  rating: f64,
  rating_count: i64
) -> Result<()> {
  conn.execute(
    "UPDATE posts SET rating = ?, rating_count = ? WHERE id = ?",
    params![rating, rating_count, post_id]
  ).context("Updating post rating")?;
  Ok(())
}

// Scheduled posts whose date has come become published.
// Returns how many were published.
pub fn publish_due_posts(conn: &Connection, now: i64) -> Result<usize> {
  conn.execute(
    "UPDATE posts SET status = ?, published_at = COALESCE(scheduled_at, ?), \
    updated_at = ? WHERE status = ? AND scheduled_at IS NOT NULL \
    AND scheduled_at <= ?",
    params![PostStatus::Published, now, now, PostStatus::Scheduled, now]
  ).context("Publishing scheduled posts")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{fixtures, memory_pool, tags};

  #[test]
  fn insert_then_fetch_by_slug() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let author = fixtures::user(&conn, "Ada", UserRole::Author);
    let id = fixtures::post(&conn, "First Post", PostStatus::Published, Some(author));
    let post = post_by_slug(&conn, "first-post").unwrap().unwrap();
    assert_eq!(post.id, id);
    assert_eq!(post.author_name.as_deref(), Some("Ada"));
    assert!(post.published_at.is_some());
    assert_eq!(post.content.as_deref(), Some("<p>First Post</p>"));
  }

  #[test]
  fn drafts_have_no_publication_date() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let id = fixtures::post(&conn, "Draft", PostStatus::Draft, None);
    let post = post_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(post.published_at, None);
    assert_eq!(post.status, PostStatus::Draft);
  }

  #[test]
  fn slug_taken_ignores_own_post() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let id = fixtures::post(&conn, "Same", PostStatus::Draft, None);
    assert!(post_slug_taken(&conn, "same", None).unwrap());
    assert!(!post_slug_taken(&conn, "same", Some(id)).unwrap());
    assert!(!post_slug_taken(&conn, "other", None).unwrap());
  }

  #[test]
  fn listing_filters_by_status_and_tag() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let rust = tags::insert_tag(&conn, "Rust", "rust").unwrap();
    let p1 = fixtures::post(&conn, "One", PostStatus::Published, None);
    fixtures::post(&conn, "Two", PostStatus::Published, None);
    fixtures::post(&conn, "Three", PostStatus::Draft, None);
    update_post(&conn, p1, &PostUpdate {
      tag_ids: Some(vec![rust]),
      ..Default::default()
    }).unwrap();

    let published = PostFilter::published();
    assert_eq!(count_posts(&conn, &published).unwrap(), 2);

    let tagged = PostFilter {
      tag_slug: Some("rust".to_string()),
      ..PostFilter::published()
    };
    let posts = list_posts(&conn, &tagged, 0, 10, Order::Desc).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, p1);
    assert_eq!(posts[0].tags[0].slug, "rust");
    // Listings don't carry the content:
    assert_eq!(posts[0].content, None);
  }

  #[test]
  fn listing_paginates() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    for i in 0..5 {
      fixtures::post(&conn, &format!("Post {}", i), PostStatus::Published, None);
    }
    let page = list_posts(&conn, &PostFilter::published(), 3, 10, Order::Asc).unwrap();
    assert_eq!(page.len(), 2);
  }

  #[test]
  fn partial_update_only_touches_given_fields() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let id = fixtures::post(&conn, "Before", PostStatus::Draft, None);
    let updated = update_post(&conn, id, &PostUpdate {
      excerpt: Some("New excerpt".to_string()),
      featured_image: Some(Some("/img/a.png".to_string())),
      status: Some(PostStatus::Published),
      ..Default::default()
    }).unwrap();
    assert!(updated);
    let post = post_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(post.title, "Before");
    assert_eq!(post.excerpt, "New excerpt");
    assert_eq!(post.featured_image.as_deref(), Some("/img/a.png"));
    assert!(post.published_at.is_some());

    update_post(&conn, id, &PostUpdate {
      featured_image: Some(None),
      ..Default::default()
    }).unwrap();
    let post = post_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(post.featured_image, None);

    update_post(&conn, id, &PostUpdate {
      seo: SeoUpdate {
        meta_title: Some(Some("MT".to_string())),
        meta_keywords: Some(Some("rust".to_string())),
        ..Default::default()
      },
      ..Default::default()
    }).unwrap();
    update_post(&conn, id, &PostUpdate {
      seo: SeoUpdate {
        meta_keywords: Some(None),
        ..Default::default()
      },
      ..Default::default()
    }).unwrap();
    let post = post_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(post.seo.meta_title.as_deref(), Some("MT"));
    assert_eq!(post.seo.meta_keywords, None);
  }

  #[test]
  fn updating_missing_post_returns_false() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    assert!(!update_post(&conn, 42, &PostUpdate::default()).unwrap());
  }

  #[test]
  fn due_scheduled_posts_get_published() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let due = fixtures::post(&conn, "Due", PostStatus::Scheduled, None);
    let later = fixtures::post(&conn, "Later", PostStatus::Scheduled, None);
    update_post(&conn, due, &PostUpdate {
      scheduled_at: Some(Some(100)),
      ..Default::default()
    }).unwrap();
    update_post(&conn, later, &PostUpdate {
      scheduled_at: Some(Some(10_000)),
      ..Default::default()
    }).unwrap();

    assert_eq!(publish_due_posts(&conn, 500).unwrap(), 1);
    let post = post_by_id(&conn, due).unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.published_at, Some(100));
    let post = post_by_id(&conn, later).unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Scheduled);
  }

  #[test]
  fn view_count_increments() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let id = fixtures::post(&conn, "Viewed", PostStatus::Published, None);
    increment_view_count(&conn, id).unwrap();
    increment_view_count(&conn, id).unwrap();
    assert_eq!(post_by_id(&conn, id).unwrap().unwrap().view_count, 2);
  }
}
