use actix_web::{web, HttpRequest, HttpResponse, Result};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use log::info;
use crate::db::{self, Order};
use crate::db::entities::*;
use crate::db::helpers::resolve_unique_slug;
use crate::db::posts::PostFilter;
use crate::utils::{serde_utils, text_utils, time_utils};
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::auth::AdminUser;
use super::super::helpers;
use super::super::AppState;
use super::{published_post, required};

const MAX_POSTS: usize = 10;
const MAX_POSTS_LIMIT: usize = 50;
// Length of the excerpts generated from the content:
const EXCERPT_LENGTH: usize = 200;

#[derive(Deserialize)]
pub struct PostsQuery {
  pub start: Option<usize>,
  pub max: Option<usize>,
  pub category: Option<String>,
  pub tag: Option<String>,
  pub order: Option<String>
}

#[derive(Deserialize)]
pub struct AdminPostsQuery {
  pub status: Option<PostStatus>,
  pub start: Option<usize>,
  pub max: Option<usize>
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPostForm {
  pub title: String,
  pub slug: Option<String>,
  #[serde(default)]
  pub content: String,
  pub excerpt: Option<String>,
  pub status: Option<PostStatus>,
  pub category_id: Option<i64>,
  pub featured_image: Option<String>,
  #[serde(default)]
  pub seo: SeoFields,
  pub scheduled_at: Option<String>,
  #[serde(default)]
  pub tag_ids: Vec<i64>
}

// Absent fields are left alone. The double options can
// also be set to null to clear the column.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdateForm {
  pub title: Option<String>,
  pub slug: Option<String>,
  pub content: Option<String>,
  pub excerpt: Option<String>,
  pub status: Option<PostStatus>,
  #[serde(default, deserialize_with = "serde_utils::double_option")]
  pub category_id: Option<Option<i64>>,
  #[serde(default, deserialize_with = "serde_utils::double_option")]
  pub featured_image: Option<Option<String>>,
  #[serde(default, deserialize_with = "serde_utils::double_option")]
  pub scheduled_at: Option<Option<String>>,
  #[serde(default)]
  pub seo: SeoUpdate,
  pub tag_ids: Option<Vec<i64>>
}

fn parse_scheduled_at(value: &str) -> Result<i64, Error> {
  time_utils::parse_datetime(value)
    .ok_or_else(|| Error::BadRequest("scheduledAt must be an RFC 3339 date".to_string()))
}

fn check_references(
  conn: &Connection,
  category_id: Option<i64>,
  tag_ids: &[i64]
) -> Result<(), Error> {
  if let Some(id) = category_id {
    if db::categories::category_by_id(conn, id).map_err(map_db_error)?.is_none() {
      return Err(Error::BadRequest(format!("Category {} does not exist", id)));
    }
  }
  let missing = db::tags::missing_tag_ids(conn, tag_ids).map_err(map_db_error)?;
  if !missing.is_empty() {
    return Err(Error::BadRequest(format!("Unknown tag ids: {:?}", missing)));
  }
  Ok(())
}

pub async fn posts(
  app_state: web::Data<AppState>,
  query: web::Query<PostsQuery>
) -> Result<HttpResponse, Error> {
  let (start, max) = helpers::page_bounds(query.start, query.max, MAX_POSTS, MAX_POSTS_LIMIT);
  let filter = PostFilter {
    category_slug: serde_utils::empty_string_to_none(query.category.clone()),
    tag_slug: serde_utils::empty_string_to_none(query.tag.clone()),
    ..PostFilter::published()
  };
  let order = Order::from_query(query.order.as_deref());

  let conn = helpers::db_conn(&app_state)?;
  let count = db::posts::count_posts(&conn, &filter).map_err(map_db_error)?;
  // Past the last post is a 404, like it's always been.
  if start >= count {
    return Err(Error::NotFound(String::from("No posts found")));
  }
  let posts = db::posts::list_posts(&conn, &filter, start, max, order)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(PostPageDto {
    count,
    posts: posts.into_iter().map(Into::into).collect()
  }))
}

pub async fn post(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let slug = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  let mut post = published_post(&conn, &slug)?;
  db::posts::increment_view_count(&conn, post.id).map_err(map_db_error)?;
  post.view_count += 1;
  // The stats thread needs a connection too.
  drop(conn);
  helpers::record_page_view(&app_state.stats_service, post.id, &req);
  Ok(HttpResponse::Ok().json(PostDto::from(post)))
}

pub async fn admin_posts(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  query: web::Query<AdminPostsQuery>
) -> Result<HttpResponse, Error> {
  let (start, max) = helpers::page_bounds(query.start, query.max, MAX_POSTS, MAX_POSTS_LIMIT);
  let filter = PostFilter {
    status: query.status,
    ..Default::default()
  };
  let conn = helpers::db_conn(&app_state)?;
  let count = db::posts::count_posts(&conn, &filter).map_err(map_db_error)?;
  let posts = db::posts::list_posts(&conn, &filter, start, max, Order::Desc)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(PostPageDto {
    count,
    posts: posts.into_iter().map(Into::into).collect()
  }))
}

pub async fn create_post(
  admin: AdminUser,
  app_state: web::Data<AppState>,
  form: web::Json<NewPostForm>
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  let title = required(&form.title, "Title")?;
  let status = form.status.unwrap_or(PostStatus::Draft);
  let scheduled_at = form.scheduled_at.as_deref()
    .map(parse_scheduled_at)
    .transpose()?;
  if status == PostStatus::Scheduled && scheduled_at.is_none() {
    return Err(Error::BadRequest("Scheduled posts need a scheduledAt date".to_string()));
  }

  let mut conn = helpers::db_conn(&app_state)?;
  // The slug check and the insert can't interleave with
  // another write.
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  check_references(&tx, form.category_id, &form.tag_ids)?;
  let slug_source = serde_utils::empty_string_to_none(form.slug)
    .unwrap_or_else(|| title.clone());
  let slug = resolve_unique_slug(
    &slug_source,
    |candidate| db::posts::post_slug_taken(&tx, candidate, None)
  ).map_err(map_db_error)?;
  let excerpt = serde_utils::empty_string_to_none(form.excerpt)
    .unwrap_or_else(|| text_utils::excerpt_from_html(&form.content, EXCERPT_LENGTH));

  let new_post = NewPost {
    title,
    slug,
    content: form.content,
    excerpt,
    status,
    author_id: Some(admin.0.id),
    category_id: form.category_id,
    featured_image: serde_utils::empty_string_to_none(form.featured_image),
    seo: form.seo,
    scheduled_at,
    tag_ids: form.tag_ids
  };
  let id = db::posts::insert_post(&tx, &new_post).map_err(map_db_error)?;
  tx.commit()?;
  info!("Post {} created with slug {}", id, new_post.slug);

  let post = db::posts::post_by_id(&conn, id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::InternalServerError("Post vanished after insert".to_string()))?;
  Ok(HttpResponse::Created().json(PostDto::from(post)))
}

pub async fn update_post(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  form: web::Json<PostUpdateForm>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let form = form.into_inner();
  let title = form.title.as_deref()
    .map(|t| required(t, "Title"))
    .transpose()?;
  let scheduled_at = match form.scheduled_at {
    Some(Some(value)) => Some(Some(parse_scheduled_at(&value)?)),
    Some(None) => Some(None),
    None => None
  };

  let mut conn = helpers::db_conn(&app_state)?;
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let existing = db::posts::post_by_id(&tx, id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound("Post does not exist".to_string()))?;

  let status = form.status.unwrap_or(existing.status);
  if status == PostStatus::Scheduled && scheduled_at.unwrap_or(existing.scheduled_at).is_none() {
    return Err(Error::BadRequest("Scheduled posts need a scheduledAt date".to_string()));
  }
  check_references(
    &tx,
    form.category_id.flatten(),
    form.tag_ids.as_deref().unwrap_or_default()
  )?;

  // A new title or an explicit slug means a new slug. The
  // post's own current slug doesn't count as taken.
  let slug = match serde_utils::empty_string_to_none(form.slug).or_else(|| title.clone()) {
    Some(source) => Some(
      resolve_unique_slug(
        &source,
        |candidate| db::posts::post_slug_taken(&tx, candidate, Some(id))
      ).map_err(map_db_error)?
    ),
    None => None
  };
  // An empty excerpt asks for a generated one.
  let excerpt = match form.excerpt {
    Some(excerpt) if !excerpt.trim().is_empty() => Some(excerpt.trim().to_string()),
    Some(_) => form.content.as_ref()
      .or(existing.content.as_ref())
      .map(|content| text_utils::excerpt_from_html(content, EXCERPT_LENGTH)),
    None => None
  };

  let update = PostUpdate {
    title,
    slug,
    content: form.content,
    excerpt,
    status: form.status,
    category_id: form.category_id,
    featured_image: form.featured_image.map(serde_utils::empty_string_to_none),
    seo: form.seo,
    scheduled_at,
    tag_ids: form.tag_ids
  };
  db::posts::update_post(&tx, id, &update).map_err(map_db_error)?;
  tx.commit()?;
  info!("Post {} updated", id);

  let post = db::posts::post_by_id(&conn, id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound("Post does not exist".to_string()))?;
  Ok(HttpResponse::Ok().json(PostDto::from(post)))
}

pub async fn delete_post(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  if db::posts::delete_post(&conn, id).map_err(map_db_error)? {
    info!("Post {} deleted", id);
    Ok(HttpResponse::Ok().json(JsonStatus::success_with_id("Post deleted", id)))
  } else {
    Err(Error::NotFound("Post does not exist".to_string()))
  }
}
