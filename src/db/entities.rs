use derive_more::Display;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Plain datatypes mapped straight out of SQLite rows.
// Timestamps are unix seconds, the DTOs format them.

#[derive(Debug, Display)]
#[display(fmt = "Unknown value: {}", _0)]
pub struct UnknownVariant(pub String);

impl std::error::Error for UnknownVariant {}

// The status-like enums are stored as lowercase text. This
// wires FromStr and Display into rusqlite so they can be used
// as query params and read from rows directly.
macro_rules! text_column {
  ($name:ident { $($variant:ident => $text:expr),+ $(,)? }) => {
    impl $name {
      pub fn as_str(&self) -> &'static str {
        match self {
          $($name::$variant => $text),+
        }
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl FromStr for $name {
      type Err = UnknownVariant;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($text => Ok($name::$variant),)+
          other => Err(UnknownVariant(other.to_string()))
        }
      }
    }

    impl ToSql for $name {
      fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
      }
    }

    impl FromSql for $name {
      fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?
          .parse()
          .map_err(|e| FromSqlError::Other(Box::new(e)))
      }
    }
  };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
  Draft,
  Published,
  Scheduled,
  Archived
}

text_column!(PostStatus {
  Draft => "draft",
  Published => "published",
  Scheduled => "scheduled",
  Archived => "archived"
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
  Pending,
  Approved,
  Spam,
  Trash
}

text_column!(CommentStatus {
  Pending => "pending",
  Approved => "approved",
  Spam => "spam",
  Trash => "trash"
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
  Admin,
  Author,
  Reader
}

text_column!(UserRole {
  Admin => "admin",
  Author => "author",
  Reader => "reader"
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  Info,
  Success,
  Warning,
  Error
}

text_column!(NotificationKind {
  Info => "info",
  Success => "success",
  Warning => "warning",
  Error => "error"
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoFields {
  pub meta_title: Option<String>,
  pub meta_description: Option<String>,
  pub meta_keywords: Option<String>,
  pub canonical_url: Option<String>,
  pub og_image: Option<String>
}

// Partial SEO update: absent fields are left alone, null
// clears the column.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoUpdate {
  #[serde(default, deserialize_with = "crate::utils::serde_utils::double_option")]
  pub meta_title: Option<Option<String>>,
  #[serde(default, deserialize_with = "crate::utils::serde_utils::double_option")]
  pub meta_description: Option<Option<String>>,
  #[serde(default, deserialize_with = "crate::utils::serde_utils::double_option")]
  pub meta_keywords: Option<Option<String>>,
  #[serde(default, deserialize_with = "crate::utils::serde_utils::double_option")]
  pub canonical_url: Option<Option<String>>,
  #[serde(default, deserialize_with = "crate::utils::serde_utils::double_option")]
  pub og_image: Option<Option<String>>
}

#[derive(Debug, Clone)]
pub struct Post {
  pub id: i64,
  pub title: String,
  pub slug: String,
  pub content: Option<String>,
  pub excerpt: String,
  pub status: PostStatus,
  pub author_id: Option<i64>,
  pub author_name: Option<String>,
  pub category_id: Option<i64>,
  pub category_name: Option<String>,
  pub category_slug: Option<String>,
  pub featured_image: Option<String>,
  pub view_count: i64,
  pub rating: f64,
  pub rating_count: i64,
  pub seo: SeoFields,
  pub published_at: Option<i64>,
  pub scheduled_at: Option<i64>,
  pub created_at: i64,
  pub updated_at: i64,
  pub tags: Vec<Tag>
}

// Everything required to insert a post. The slug is the
// final, collision free one.
#[derive(Debug)]
pub struct NewPost {
  pub title: String,
  pub slug: String,
  pub content: String,
  pub excerpt: String,
  pub status: PostStatus,
  pub author_id: Option<i64>,
  pub category_id: Option<i64>,
  pub featured_image: Option<String>,
  pub seo: SeoFields,
  pub scheduled_at: Option<i64>,
  pub tag_ids: Vec<i64>
}

// "Update only what's in the request body". Double options
// are for nullable columns: Some(None) clears the column.
#[derive(Debug, Default)]
pub struct PostUpdate {
  pub title: Option<String>,
  pub slug: Option<String>,
  pub content: Option<String>,
  pub excerpt: Option<String>,
  pub status: Option<PostStatus>,
  pub category_id: Option<Option<i64>>,
  pub featured_image: Option<Option<String>>,
  pub seo: SeoUpdate,
  pub scheduled_at: Option<Option<i64>>,
  pub tag_ids: Option<Vec<i64>>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
  pub id: i64,
  pub name: String,
  pub slug: String
}

#[derive(Debug, Clone)]
pub struct Category {
  pub id: i64,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub parent_id: Option<i64>,
  pub subtopics: Vec<String>,
  pub created_at: i64
}

#[derive(Debug, Clone)]
pub struct Comment {
  pub id: i64,
  pub post_id: i64,
  pub parent_id: Option<i64>,
  pub user_id: Option<i64>,
  pub author_name: String,
  pub author_email: String,
  pub content: String,
  pub status: CommentStatus,
  pub rating: Option<i32>,
  pub client_ip: Option<String>,
  pub created_at: i64
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
  pub id: i64,
  pub post_id: i64,
  pub user_id: i64,
  pub value: i32,
  pub created_at: i64,
  pub updated_at: i64
}

#[derive(Debug, Clone)]
pub struct User {
  pub id: i64,
  pub name: String,
  pub email: String,
  pub role: UserRole,
  pub created_at: i64
}

#[derive(Debug, Clone)]
pub struct Notification {
  pub id: i64,
  pub recipient_id: i64,
  pub kind: NotificationKind,
  pub title: String,
  pub message: String,
  pub link: Option<String>,
  pub read: bool,
  pub created_at: i64
}

#[derive(Debug, Clone)]
pub struct NewNotification {
  pub recipient_id: i64,
  pub kind: NotificationKind,
  pub title: String,
  pub message: String,
  pub link: Option<String>
}

#[derive(Debug, Clone)]
pub struct Testimonial {
  pub id: i64,
  pub author_name: String,
  pub author_role: Option<String>,
  pub content: String,
  pub rating: Option<i32>,
  pub approved: bool,
  pub created_at: i64
}

#[derive(Debug, Clone)]
pub struct Faq {
  pub id: i64,
  pub question: String,
  pub answer: String,
  pub position: i64,
  pub published: bool
}

#[derive(Debug, Clone)]
pub struct Subscriber {
  pub id: i64,
  pub email: String,
  pub name: Option<String>,
  pub token: String,
  pub active: bool,
  pub created_at: i64
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdSenseStat {
  pub day: String,
  pub slot: String,
  pub impressions: i64,
  pub clicks: i64,
  pub earnings: f64
}

#[derive(Debug, Clone)]
pub struct PageView {
  pub post_id: Option<i64>,
  pub path: String,
  pub visitor_ip: String,
  pub user_agent: String,
  pub referrer: Option<String>,
  pub created_at: i64
}
