use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::Deserialize;
use crate::comments::{self, build_tree, CommentAuthor, CommentSubmission};
use crate::db;
use crate::db::entities::CommentStatus;
use crate::ratings;
use crate::utils::text_utils;
use super::super::auth::{AdminUser, AuthenticatedUser};
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::helpers;
use super::super::AppState;
use super::{published_post, MAX_AUTHOR_LENGTH};

const MAX_COMMENT_LENGTH: usize = 2000;
const MAX_MODERATION_PAGE: usize = 30;
const MAX_MODERATION_PAGE_LIMIT: usize = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentForm {
  pub content: String,
  // Guests only, members post under their account.
  pub author_name: Option<String>,
  pub author_email: Option<String>,
  pub parent_id: Option<i64>,
  pub rating: Option<i32>
}

#[derive(Deserialize)]
pub struct ModerationQuery {
  pub status: Option<CommentStatus>,
  pub start: Option<usize>,
  pub max: Option<usize>
}

#[derive(Deserialize)]
pub struct StatusForm {
  pub status: CommentStatus
}

pub async fn post_comments(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>
) -> Result<HttpResponse, Error> {
  let slug = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  let post = published_post(&conn, &slug)?;
  let comments = db::comments::approved_comments_for_post(&conn, post.id)
    .map_err(map_db_error)?;
  let count = comments.len();
  Ok(HttpResponse::Ok().json(CommentThreadsDto {
    count,
    comments: CommentThreadDto::from_tree(
      build_tree(comments),
      app_state.site_info.comment_collapse_depth
    )
  }))
}

pub async fn post_comment(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  user: Option<AuthenticatedUser>,
  form: web::Json<CommentForm>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let slug = path.into_inner().0;
  let mut form = form.into_inner();

  // truncate_utf8 because String::truncate panics in the
  // middle of a multibyte char.
  text_utils::truncate_utf8(&mut form.content, MAX_COMMENT_LENGTH);
  let content = text_utils::escape_html(form.content.trim());
  if content.is_empty() {
    return Err(Error::BadRequest(String::from("Comment cannot be empty")));
  }
  if let Some(rating) = form.rating {
    if !ratings::is_valid_rating(rating) {
      return Err(Error::BadRequest(format!(
        "Rating must be between {} and {}",
        ratings::MIN_RATING,
        ratings::MAX_RATING
      )));
    }
  }

  let author = match user {
    Some(AuthenticatedUser(user)) => CommentAuthor::Member(user),
    None => {
      let mut name = form.author_name.unwrap_or_default();
      text_utils::truncate_utf8(&mut name, MAX_AUTHOR_LENGTH);
      let name = text_utils::escape_html(name.trim());
      let email = form.author_email.unwrap_or_default().trim().to_lowercase();
      if name.is_empty() {
        return Err(Error::BadRequest(String::from("Author name cannot be empty")));
      }
      if !text_utils::is_valid_email(&email) {
        return Err(Error::BadRequest(String::from("Invalid email address")));
      }
      CommentAuthor::Guest { name, email }
    }
  };

  if app_state.check_rate_limit() {
    return Err(Error::TooManyRequests);
  }

  let mut conn = helpers::db_conn(&app_state)?;
  let post = published_post(&conn, &slug)?;
  let comment = comments::submit_comment(
    &mut conn,
    &post,
    CommentSubmission {
      parent_id: form.parent_id,
      author,
      content,
      rating: form.rating,
      client_ip: helpers::real_ip_addr(&req).map(|ip| ip.to_string()),
      post_link: helpers::post_path(&app_state.site_info, &post.slug)
    }
  )?;
  Ok(HttpResponse::Created().json(CommentDto::from(comment)))
}

pub async fn admin_comments(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  query: web::Query<ModerationQuery>
) -> Result<HttpResponse, Error> {
  let status = query.status.unwrap_or(CommentStatus::Pending);
  let (start, max) = helpers::page_bounds(
    query.start,
    query.max,
    MAX_MODERATION_PAGE,
    MAX_MODERATION_PAGE_LIMIT
  );
  let conn = helpers::db_conn(&app_state)?;
  let count = db::comments::count_comments_by_status(&conn, status)
    .map_err(map_db_error)?;
  let comments = db::comments::comments_by_status(&conn, status, start, max)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(ModerationPageDto {
    status,
    count,
    comments: comments.into_iter().map(CommentDto::for_moderation).collect()
  }))
}

pub async fn moderate_comment(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  form: web::Json<StatusForm>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let mut conn = helpers::db_conn(&app_state)?;
  let comment = comments::moderate_comment(&mut conn, id, form.status)?;
  Ok(HttpResponse::Ok().json(CommentDto::for_moderation(comment)))
}

pub async fn delete_comment(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let mut conn = helpers::db_conn(&app_state)?;
  comments::remove_comment(&mut conn, id)?;
  Ok(HttpResponse::Ok().json(JsonStatus::success_with_id("Comment deleted", id)))
}
