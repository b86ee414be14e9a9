use actix_web::{web, HttpResponse, Result};
use handlebars::Handlebars;
use log::{error, info};
use crate::db;
use crate::ratings;
use crate::utils::time_utils;
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::helpers;
use super::super::AppState;

// Max length of post content in RSS descriptions:
const MAX_RSS_LENGTH: usize = 2500;
const MAX_RSS_ITEMS: usize = 50;
const MAX_SITEMAP_URLS: usize = 5000;

// Everything here sits behind the IP guard, a cronjob calls
// these endpoints. No rate limiting.

fn render_xml<T: serde::Serialize>(
  hb: &Handlebars<'_>,
  template: &str,
  data: &T
) -> Result<HttpResponse, Error> {
  let body = hb.render(template, data)
    .map_err(|e| {
      error!("Template engine error when rendering {}: {}", template, e);
      Error::InternalServerError("Template engine error".to_string())
    })?;
  Ok(
    HttpResponse::Ok()
    .content_type("application/xml")
    .body(body)
  )
}

pub async fn rss(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let posts = db::posts::published_posts_with_content(&conn, MAX_RSS_ITEMS)
    .map_err(map_db_error)?;
  drop(conn);
  let mut data = RssFeed::new(&app_state.site_info, MAX_RSS_LENGTH);
  for post in posts {
    data.add_item(post);
  }
  render_xml(&hb, "rss", &data)
}

pub async fn sitemap(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let posts = db::posts::published_posts_with_content(&conn, MAX_SITEMAP_URLS)
    .map_err(map_db_error)?;
  drop(conn);
  render_xml(&hb, "sitemap", &Sitemap::new(&app_state.site_info, posts))
}

pub async fn publish_scheduled(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let count = db::posts::publish_due_posts(&conn, time_utils::current_timestamp())
    .map_err(map_db_error)?;
  if count > 0 {
    info!("Published {} scheduled post(s)", count);
  }
  Ok(HttpResponse::Ok().json(JsonStatus::success(&format!("{} post(s) published", count))))
}

pub async fn recompute_ratings(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let mut conn = helpers::db_conn(&app_state)?;
  let count = ratings::recompute_all(&mut conn).map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(JsonStatus::success(&format!("{} post(s) recomputed", count))))
}

#[cfg(test)]
mod tests {
  use actix_web::{http::StatusCode, test};
  use rusqlite::params;
  use crate::app::dtos::JsonStatus;
  use crate::app::test_support;
  use crate::db::{fixtures, memory_pool, posts};
  use crate::db::entities::*;

  #[actix_web::test]
  async fn feeds_are_restricted_to_localhost() {
    let pool = memory_pool();
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;
    for uri in ["/rss", "/sitemap", "/publish-scheduled", "/recompute-ratings"] {
      let req = test::TestRequest::get()
        .uri(uri)
        .peer_addr("203.0.113.7:4242".parse().unwrap())
        .to_request();
      assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
  }

  #[actix_web::test]
  async fn rss_lists_published_posts_only() {
    let pool = memory_pool();
    {
      let conn = pool.get().unwrap();
      fixtures::post(&conn, "Out in the open", PostStatus::Published, None);
      fixtures::post(&conn, "Still a draft", PostStatus::Draft, None);
    }
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;
    let req = test::TestRequest::get()
      .uri("/rss")
      .peer_addr("127.0.0.1:4242".parse().unwrap())
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("<title>Out in the open</title>"));
    assert!(body.contains("https://blog.test/posts/out-in-the-open"));
    assert!(!body.contains("Still a draft"));
  }

  #[actix_web::test]
  async fn sitemap_has_home_and_posts() {
    let pool = memory_pool();
    {
      let conn = pool.get().unwrap();
      fixtures::post(&conn, "Mapped", PostStatus::Published, None);
    }
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;
    let req = test::TestRequest::get()
      .uri("/sitemap")
      .peer_addr("127.0.0.1:4242".parse().unwrap())
      .to_request();
    let body = test::call_and_read_body(&app, req).await;
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains("<loc>https://blog.test/</loc>"));
    assert!(body.contains("<loc>https://blog.test/posts/mapped</loc>"));
  }

  #[actix_web::test]
  async fn due_scheduled_posts_get_published() {
    let pool = memory_pool();
    let id = {
      let conn = pool.get().unwrap();
      let id = fixtures::post(&conn, "Later", PostStatus::Scheduled, None);
      conn.execute("UPDATE posts SET scheduled_at = 1000 WHERE id = ?", params![id]).unwrap();
      id
    };
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;
    let req = test::TestRequest::get()
      .uri("/publish-scheduled")
      .peer_addr("127.0.0.1:4242".parse().unwrap())
      .to_request();
    let status: JsonStatus = test::call_and_read_body_json(&app, req).await;
    assert!(status.success);

    let conn = pool.get().unwrap();
    let post = posts::post_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.published_at, Some(1000));
  }
}
