use super::entities::*;
use rusqlite::{Row, Error};

// Column lists live next to their mappers so the indexes
// can't drift apart.

pub const POST_FROM: &'static str = "posts \
  LEFT JOIN users ON users.id = posts.author_id \
  LEFT JOIN categories ON categories.id = posts.category_id";

// Listings don't need the content, which is the heavy part.
pub fn post_fields(with_content: bool) -> Vec<&'static str> {
  vec![
    "posts.id", "posts.title", "posts.slug",
    if with_content { "posts.content" } else { "NULL" },
    "posts.excerpt", "posts.status", "posts.author_id", "users.name",
    "posts.category_id", "categories.name", "categories.slug",
    "posts.featured_image", "posts.view_count", "posts.rating",
    "posts.rating_count", "posts.meta_title", "posts.meta_description",
    "posts.meta_keywords", "posts.canonical_url", "posts.og_image",
    "posts.published_at", "posts.scheduled_at", "posts.created_at",
    "posts.updated_at"
  ]
}

// Tags are loaded separately.
pub fn map_post(row: &Row) -> Result<Post, Error> {
  Ok(Post {
    id: row.get(0)?,
    title: row.get(1)?,
    slug: row.get(2)?,
    content: row.get(3)?,
    excerpt: row.get(4)?,
    status: row.get(5)?,
    author_id: row.get(6)?,
    author_name: row.get(7)?,
    category_id: row.get(8)?,
    category_name: row.get(9)?,
    category_slug: row.get(10)?,
    featured_image: row.get(11)?,
    view_count: row.get(12)?,
    rating: row.get(13)?,
    rating_count: row.get(14)?,
    seo: SeoFields {
      meta_title: row.get(15)?,
      meta_description: row.get(16)?,
      meta_keywords: row.get(17)?,
      canonical_url: row.get(18)?,
      og_image: row.get(19)?
    },
    published_at: row.get(20)?,
    scheduled_at: row.get(21)?,
    created_at: row.get(22)?,
    updated_at: row.get(23)?,
    tags: Vec::new()
  })
}

pub const TAG_FIELDS: &'static str = "tags.id, tags.name, tags.slug";

pub fn map_tag(row: &Row) -> Result<Tag, Error> {
  Ok(Tag {
    id: row.get(0)?,
    name: row.get(1)?,
    slug: row.get(2)?
  })
}

pub const CATEGORY_FIELDS: &'static str =
  "id, name, slug, description, parent_id, subtopics, created_at";

pub fn map_category(row: &Row) -> Result<Category, Error> {
  // Sub-topics are a JSON array in a TEXT column.
  let subtopics: String = row.get(5)?;
  let subtopics: Vec<String> = serde_json::from_str(&subtopics)
    .map_err(|e| Error::FromSqlConversionFailure(
      5,
      rusqlite::types::Type::Text,
      Box::new(e)
    ))?;
  Ok(Category {
    id: row.get(0)?,
    name: row.get(1)?,
    slug: row.get(2)?,
    description: row.get(3)?,
    parent_id: row.get(4)?,
    subtopics,
    created_at: row.get(6)?
  })
}

pub const COMMENT_FIELDS: &'static str = "id, post_id, parent_id, user_id, \
  author_name, author_email, content, status, rating, client_ip, created_at";

pub fn map_comment(row: &Row) -> Result<Comment, Error> {
  Ok(Comment {
    id: row.get(0)?,
    post_id: row.get(1)?,
    parent_id: row.get(2)?,
    user_id: row.get(3)?,
    author_name: row.get(4)?,
    author_email: row.get(5)?,
    content: row.get(6)?,
    status: row.get(7)?,
    rating: row.get(8)?,
    client_ip: row.get(9)?,
    created_at: row.get(10)?
  })
}

pub const RATING_FIELDS: &'static str =
  "id, post_id, user_id, value, created_at, updated_at";

pub fn map_rating(row: &Row) -> Result<Rating, Error> {
  Ok(Rating {
    id: row.get(0)?,
    post_id: row.get(1)?,
    user_id: row.get(2)?,
    value: row.get(3)?,
    created_at: row.get(4)?,
    updated_at: row.get(5)?
  })
}

pub const USER_FIELDS: &'static str = "id, name, email, role, created_at";

pub fn map_user(row: &Row) -> Result<User, Error> {
  Ok(User {
    id: row.get(0)?,
    name: row.get(1)?,
    email: row.get(2)?,
    role: row.get(3)?,
    created_at: row.get(4)?
  })
}

pub const NOTIFICATION_FIELDS: &'static str =
  "id, recipient_id, kind, title, message, link, is_read, created_at";

pub fn map_notification(row: &Row) -> Result<Notification, Error> {
  Ok(Notification {
    id: row.get(0)?,
    recipient_id: row.get(1)?,
    kind: row.get(2)?,
    title: row.get(3)?,
    message: row.get(4)?,
    link: row.get(5)?,
    read: row.get(6)?,
    created_at: row.get(7)?
  })
}

pub const TESTIMONIAL_FIELDS: &'static str =
  "id, author_name, author_role, content, rating, approved, created_at";

pub fn map_testimonial(row: &Row) -> Result<Testimonial, Error> {
  Ok(Testimonial {
    id: row.get(0)?,
    author_name: row.get(1)?,
    author_role: row.get(2)?,
    content: row.get(3)?,
    rating: row.get(4)?,
    approved: row.get(5)?,
    created_at: row.get(6)?
  })
}

pub const FAQ_FIELDS: &'static str = "id, question, answer, position, published";

pub fn map_faq(row: &Row) -> Result<Faq, Error> {
  Ok(Faq {
    id: row.get(0)?,
    question: row.get(1)?,
    answer: row.get(2)?,
    position: row.get(3)?,
    published: row.get(4)?
  })
}

pub const SUBSCRIBER_FIELDS: &'static str =
  "id, email, name, token, active, created_at";

pub fn map_subscriber(row: &Row) -> Result<Subscriber, Error> {
  Ok(Subscriber {
    id: row.get(0)?,
    email: row.get(1)?,
    name: row.get(2)?,
    token: row.get(3)?,
    active: row.get(4)?,
    created_at: row.get(5)?
  })
}

pub const ADSENSE_FIELDS: &'static str = "day, slot, impressions, clicks, earnings";

pub fn map_adsense_stat(row: &Row) -> Result<AdSenseStat, Error> {
  Ok(AdSenseStat {
    day: row.get(0)?,
    slot: row.get(1)?,
    impressions: row.get(2)?,
    clicks: row.get(3)?,
    earnings: row.get(4)?
  })
}
