use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use crate::db;
use crate::db::entities::{NewNotification, NotificationKind};
use crate::utils::serde_utils;
use super::super::auth::{AdminUser, AuthenticatedUser};
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::helpers;
use super::super::AppState;
use super::required;

const DEFAULT_MAX_NOTIFICATIONS: usize = 30;
const MAX_NOTIFICATIONS_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct NotificationsQuery {
  pub unread: Option<bool>,
  pub max: Option<usize>
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationForm {
  pub recipient_id: i64,
  #[serde(rename = "type", default = "default_kind")]
  pub kind: NotificationKind,
  pub title: String,
  pub message: String,
  pub link: Option<String>
}

fn default_kind() -> NotificationKind {
  NotificationKind::Info
}

pub async fn notifications(
  user: AuthenticatedUser,
  app_state: web::Data<AppState>,
  query: web::Query<NotificationsQuery>
) -> Result<HttpResponse, Error> {
  let (_, max) = helpers::page_bounds(
    None,
    query.max,
    DEFAULT_MAX_NOTIFICATIONS,
    MAX_NOTIFICATIONS_LIMIT
  );
  let conn = helpers::db_conn(&app_state)?;
  let notifications = db::notifications::notifications_for(
    &conn,
    user.0.id,
    query.unread.unwrap_or(false),
    max
  ).map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(
    notifications.into_iter().map(NotificationDto::from).collect::<Vec<_>>()
  ))
}

pub async fn unread_count(
  user: AuthenticatedUser,
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let unread = db::notifications::unread_count(&conn, user.0.id)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(UnreadCountDto { unread }))
}

// Someone else's notification is a 404, same as a missing one.
pub async fn mark_read(
  user: AuthenticatedUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  if db::notifications::mark_read(&conn, id, user.0.id).map_err(map_db_error)? {
    Ok(HttpResponse::Ok().json(JsonStatus::success_with_id("Notification read", id)))
  } else {
    Err(Error::NotFound("Notification does not exist".to_string()))
  }
}

pub async fn mark_all_read(
  user: AuthenticatedUser,
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let count = db::notifications::mark_all_read(&conn, user.0.id)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(
    JsonStatus::success(&format!("{} notification(s) marked as read", count))
  ))
}

pub async fn send_notification(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  form: web::Json<NotificationForm>
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  let notification = NewNotification {
    recipient_id: form.recipient_id,
    kind: form.kind,
    title: required(&form.title, "Title")?,
    message: required(&form.message, "Message")?,
    link: serde_utils::empty_string_to_none(form.link)
  };
  let conn = helpers::db_conn(&app_state)?;
  if db::users::user_by_id(&conn, notification.recipient_id)
    .map_err(map_db_error)?
    .is_none() {
    return Err(Error::BadRequest("Recipient does not exist".to_string()));
  }
  let id = db::notifications::insert_notification(&conn, &notification)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(JsonStatus::success_with_id("Notification sent", id)))
}

#[cfg(test)]
mod tests {
  use actix_web::{http::StatusCode, test};
  use serde_json::json;
  use crate::app::dtos::*;
  use crate::app::test_support::{self, bearer, user_with_token};
  use crate::db::memory_pool;
  use crate::db::entities::UserRole;

  #[actix_web::test]
  async fn users_only_see_and_touch_their_own() {
    let pool = memory_pool();
    let (admin_token, bob_id, bob_token, alice_token) = {
      let conn = pool.get().unwrap();
      let admin = user_with_token(&conn, "Admin", UserRole::Admin).1;
      let (bob_id, bob) = user_with_token(&conn, "Bob", UserRole::Reader);
      let alice = user_with_token(&conn, "Alice", UserRole::Reader).1;
      (admin, bob_id, bob, alice)
    };
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;

    let mut ids = Vec::new();
    for title in ["First", "Second"] {
      let req = test::TestRequest::post()
        .uri("/admin/notifications")
        .insert_header(bearer(&admin_token))
        .set_json(json!({
          "recipientId": bob_id,
          "type": "warning",
          "title": title,
          "message": "Hi Bob"
        }))
        .to_request();
      let resp = test::call_service(&app, req).await;
      assert_eq!(resp.status(), StatusCode::CREATED);
      let status: JsonStatus = test::read_body_json(resp).await;
      ids.push(status.id.unwrap());
    }

    let req = test::TestRequest::get()
      .uri("/notifications")
      .insert_header(bearer(&bob_token))
      .to_request();
    let list: Vec<NotificationDto> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].title, "Second");

    // Alice can't mark Bob's notification:
    let req = test::TestRequest::post()
      .uri(&format!("/notifications/{}/read", ids[0]))
      .insert_header(bearer(&alice_token))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
      .uri(&format!("/notifications/{}/read", ids[0]))
      .insert_header(bearer(&bob_token))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
      .uri("/notifications/unread-count")
      .insert_header(bearer(&bob_token))
      .to_request();
    let count: UnreadCountDto = test::call_and_read_body_json(&app, req).await;
    assert_eq!(count.unread, 1);

    let req = test::TestRequest::get()
      .uri("/notifications?unread=true")
      .insert_header(bearer(&bob_token))
      .to_request();
    let unread: Vec<NotificationDto> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].title, "Second");

    let req = test::TestRequest::post()
      .uri("/notifications/read-all")
      .insert_header(bearer(&bob_token))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
      .uri("/notifications/unread-count")
      .insert_header(bearer(&bob_token))
      .to_request();
    let count: UnreadCountDto = test::call_and_read_body_json(&app, req).await;
    assert_eq!(count.unread, 0);
  }

  #[actix_web::test]
  async fn only_admins_send_notifications() {
    let pool = memory_pool();
    let (bob_id, bob_token) = {
      let conn = pool.get().unwrap();
      user_with_token(&conn, "Bob", UserRole::Author)
    };
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;

    let req = test::TestRequest::post()
      .uri("/admin/notifications")
      .insert_header(bearer(&bob_token))
      .set_json(json!({ "recipientId": bob_id, "title": "Hi", "message": "Hello" }))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get().uri("/notifications").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
  }
}
