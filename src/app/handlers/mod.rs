use actix_web::{HttpResponse, Result};
use rusqlite::Connection;
use crate::db;
use crate::db::entities::{Post, PostStatus};
use super::dtos::JsonStatus;
use super::error::{map_db_error, Error};

// API handlers, grouped by what they work on.
mod posts;
mod comments;
mod ratings;
mod taxonomy;
mod notifications;
mod site;
mod analytics;
mod feeds;

pub use posts::*;
pub use comments::*;
pub use ratings::*;
pub use taxonomy::*;
pub use notifications::*;
pub use site::*;
pub use analytics::*;
pub use feeds::*;

// Max length of author names, for comments and newsletter
// subscriptions.
const MAX_AUTHOR_LENGTH: usize = 70;

pub async fn index() -> HttpResponse {
  HttpResponse::Ok().json(JsonStatus::success("Nothing here"))
}

// Default response when no route matched the request:
pub async fn not_found() -> Result<HttpResponse, Error> {
  Err(Error::NotFound(String::from("Endpoint doesn't exist")))
}

// Drafts and scheduled posts are invisible to the public
// endpoints, they get the same 404 as unknown slugs.
fn published_post(conn: &Connection, slug: &str) -> Result<Post, Error> {
  db::posts::post_by_slug(conn, slug)
    .map_err(map_db_error)?
    .filter(|post| post.status == PostStatus::Published)
    .ok_or_else(|| Error::NotFound("Post does not exist".to_string()))
}

// Required text fields of the admin forms.
fn required(value: &str, field: &str) -> Result<String, Error> {
  let value = value.trim();
  if value.is_empty() {
    Err(Error::BadRequest(format!("{} cannot be empty", field)))
  } else {
    Ok(value.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::{http::StatusCode, test};
  use crate::app::test_support;
  use crate::db::memory_pool;

  #[actix_web::test]
  async fn unknown_endpoints_are_json_404s() {
    let pool = memory_pool();
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;
    let req = test::TestRequest::get().uri("/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let status: JsonStatus = test::read_body_json(resp).await;
    assert!(!status.success);
  }

  #[actix_web::test]
  async fn required_fields_are_trimmed() {
    assert_eq!(required("  Title ", "Title").unwrap(), "Title");
    assert!(matches!(required("   ", "Title"), Err(Error::BadRequest(_))));
  }
}
