use actix_web::{web, HttpResponse, Result};
use std::collections::HashSet;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use log::info;
use crate::db;
use crate::db::categories::CategoryInput;
use crate::db::entities::{Category, Tag};
use crate::db::helpers::resolve_unique_slug;
use crate::utils::{serde_utils, text_utils};
use super::super::auth::AdminUser;
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::helpers;
use super::super::AppState;
use super::required;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForm {
  pub name: String,
  pub description: Option<String>,
  pub parent_id: Option<i64>,
  #[serde(default)]
  pub subtopics: Vec<String>
}

#[derive(Deserialize)]
pub struct TagForm {
  pub name: String
}

// Walks up from the new parent, reaching the category being
// updated means the change would make a loop.
fn check_ancestry(conn: &Connection, id: i64, parent: Category) -> Result<(), Error> {
  let mut seen = HashSet::new();
  let mut current = Some(parent);
  while let Some(category) = current {
    if category.id == id {
      return Err(Error::BadRequest(
        "A category cannot be moved under one of its subcategories".to_string()
      ));
    }
    if !seen.insert(category.id) {
      break;
    }
    current = match category.parent_id {
      Some(parent_id) => db::categories::category_by_id(conn, parent_id)
        .map_err(map_db_error)?,
      None => None
    };
  }
  Ok(())
}

// `id` is the category being updated, None on create.
fn category_input(
  conn: &Connection,
  form: CategoryForm,
  id: Option<i64>
) -> Result<CategoryInput, Error> {
  let name = required(&form.name, "Name")?;
  if db::categories::category_name_taken(conn, &name, id).map_err(map_db_error)? {
    return Err(Error::Conflict(format!("Category {} already exists", name)));
  }
  if let Some(parent_id) = form.parent_id {
    if Some(parent_id) == id {
      return Err(Error::BadRequest("A category cannot be its own parent".to_string()));
    }
    let parent = db::categories::category_by_id(conn, parent_id)
      .map_err(map_db_error)?
      .ok_or_else(|| Error::BadRequest("Parent category does not exist".to_string()))?;
    if let Some(id) = id {
      check_ancestry(conn, id, parent)?;
    }
  }
  let slug = resolve_unique_slug(
    &name,
    |candidate| db::categories::category_slug_taken(conn, candidate, id)
  ).map_err(map_db_error)?;
  Ok(CategoryInput {
    name,
    slug,
    description: serde_utils::empty_string_to_none(form.description),
    parent_id: form.parent_id,
    subtopics: text_utils::normalize_labels(form.subtopics)
  })
}

fn category_response(conn: &Connection, id: i64) -> Result<CategoryDto, Error> {
  db::categories::category_by_id(conn, id)
    .map_err(map_db_error)?
    .map(CategoryDto::from)
    .ok_or_else(|| Error::NotFound("Category does not exist".to_string()))
}

pub async fn categories(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let categories = db::categories::all_categories(&conn).map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(
    categories.into_iter().map(CategoryDto::from).collect::<Vec<_>>()
  ))
}

pub async fn create_category(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  form: web::Json<CategoryForm>
) -> Result<HttpResponse, Error> {
  let mut conn = helpers::db_conn(&app_state)?;
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let input = category_input(&tx, form.into_inner(), None)?;
  let id = db::categories::insert_category(&tx, &input).map_err(map_db_error)?;
  tx.commit()?;
  info!("Category {} created", input.name);
  Ok(HttpResponse::Created().json(category_response(&conn, id)?))
}

pub async fn update_category(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  form: web::Json<CategoryForm>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let mut conn = helpers::db_conn(&app_state)?;
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  if db::categories::category_by_id(&tx, id).map_err(map_db_error)?.is_none() {
    return Err(Error::NotFound("Category does not exist".to_string()));
  }
  let input = category_input(&tx, form.into_inner(), Some(id))?;
  db::categories::update_category(&tx, id, &input).map_err(map_db_error)?;
  tx.commit()?;
  Ok(HttpResponse::Ok().json(category_response(&conn, id)?))
}

pub async fn delete_category(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  if db::categories::delete_category(&conn, id).map_err(map_db_error)? {
    info!("Category {} deleted", id);
    Ok(HttpResponse::Ok().json(JsonStatus::success_with_id("Category deleted", id)))
  } else {
    Err(Error::NotFound("Category does not exist".to_string()))
  }
}

pub async fn tags(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let tags = db::tags::all_tags(&conn).map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(tags))
}

pub async fn create_tag(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  form: web::Json<TagForm>
) -> Result<HttpResponse, Error> {
  let name = required(&form.name, "Name")?;
  let mut conn = helpers::db_conn(&app_state)?;
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  if db::tags::tag_name_taken(&tx, &name).map_err(map_db_error)? {
    return Err(Error::Conflict(format!("Tag {} already exists", name)));
  }
  let slug = resolve_unique_slug(
    &name,
    |candidate| db::tags::tag_slug_taken(&tx, candidate)
  ).map_err(map_db_error)?;
  let id = db::tags::insert_tag(&tx, &name, &slug).map_err(map_db_error)?;
  tx.commit()?;
  Ok(HttpResponse::Created().json(Tag { id, name, slug }))
}

pub async fn delete_tag(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  if db::tags::delete_tag(&conn, id).map_err(map_db_error)? {
    Ok(HttpResponse::Ok().json(JsonStatus::success_with_id("Tag deleted", id)))
  } else {
    Err(Error::NotFound("Tag does not exist".to_string()))
  }
}
