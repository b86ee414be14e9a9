use actix_web::{web, HttpResponse, Result};
use rusqlite::TransactionBehavior;
use serde::Deserialize;
use log::info;
use crate::db;
use crate::db::entities::Faq;
use crate::ratings;
use crate::utils::{serde_utils, text_utils, token_utils};
use super::super::auth::AdminUser;
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::helpers;
use super::super::AppState;
use super::{required, MAX_AUTHOR_LENGTH};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialForm {
  pub author_name: String,
  pub author_role: Option<String>,
  pub content: String,
  pub rating: Option<i32>,
  #[serde(default)]
  pub approved: bool
}

#[derive(Deserialize)]
pub struct FaqForm {
  pub question: String,
  pub answer: String,
  #[serde(default)]
  pub position: i64,
  #[serde(default = "default_published")]
  pub published: bool
}

fn default_published() -> bool {
  true
}

#[derive(Deserialize)]
pub struct SubscribeForm {
  pub email: String,
  pub name: Option<String>
}

/* --- Testimonials --- */

pub async fn testimonials(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let testimonials = db::site_content::approved_testimonials(&conn)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(
    testimonials.into_iter().map(TestimonialDto::from).collect::<Vec<_>>()
  ))
}

pub async fn create_testimonial(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  form: web::Json<TestimonialForm>
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  let author_name = required(&form.author_name, "Author name")?;
  let content = required(&form.content, "Content")?;
  if let Some(rating) = form.rating {
    if !ratings::is_valid_rating(rating) {
      return Err(Error::BadRequest(format!(
        "Rating must be between {} and {}",
        ratings::MIN_RATING,
        ratings::MAX_RATING
      )));
    }
  }
  let author_role = serde_utils::empty_string_to_none(form.author_role);
  let conn = helpers::db_conn(&app_state)?;
  let id = db::site_content::insert_testimonial(
    &conn,
    &author_name,
    author_role.as_deref(),
    &content,
    form.rating,
    form.approved
  ).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(JsonStatus::success_with_id("Testimonial created", id)))
}

pub async fn approve_testimonial(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  if db::site_content::approve_testimonial(&conn, id).map_err(map_db_error)? {
    Ok(HttpResponse::Ok().json(JsonStatus::success_with_id("Testimonial approved", id)))
  } else {
    Err(Error::NotFound("Testimonial does not exist".to_string()))
  }
}

pub async fn delete_testimonial(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  if db::site_content::delete_testimonial(&conn, id).map_err(map_db_error)? {
    Ok(HttpResponse::Ok().json(JsonStatus::success_with_id("Testimonial deleted", id)))
  } else {
    Err(Error::NotFound("Testimonial does not exist".to_string()))
  }
}

/* --- FAQ --- */

pub async fn faqs(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let faqs = db::site_content::published_faqs(&conn).map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(faqs.into_iter().map(FaqDto::from).collect::<Vec<_>>()))
}

fn faq_from_form(id: i64, form: FaqForm) -> Result<Faq, Error> {
  Ok(Faq {
    id,
    question: required(&form.question, "Question")?,
    answer: required(&form.answer, "Answer")?,
    position: form.position,
    published: form.published
  })
}

pub async fn create_faq(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  form: web::Json<FaqForm>
) -> Result<HttpResponse, Error> {
  let mut faq = faq_from_form(0, form.into_inner())?;
  let conn = helpers::db_conn(&app_state)?;
  faq.id = db::site_content::insert_faq(&conn, &faq).map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(FaqDto::from(faq)))
}

pub async fn update_faq(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  form: web::Json<FaqForm>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let faq = faq_from_form(id, form.into_inner())?;
  let conn = helpers::db_conn(&app_state)?;
  if db::site_content::update_faq(&conn, &faq).map_err(map_db_error)? {
    Ok(HttpResponse::Ok().json(FaqDto::from(faq)))
  } else {
    Err(Error::NotFound("FAQ entry does not exist".to_string()))
  }
}

pub async fn delete_faq(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  if db::site_content::delete_faq(&conn, id).map_err(map_db_error)? {
    Ok(HttpResponse::Ok().json(JsonStatus::success_with_id("FAQ entry deleted", id)))
  } else {
    Err(Error::NotFound("FAQ entry does not exist".to_string()))
  }
}

/* --- Newsletter --- */

// The unsubscribe token is only ever sent by email, the
// response doesn't carry it.
pub async fn subscribe(
  app_state: web::Data<AppState>,
  form: web::Json<SubscribeForm>
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  let email = form.email.trim().to_lowercase();
  if !text_utils::is_valid_email(&email) {
    return Err(Error::BadRequest(String::from("Invalid email address")));
  }
  let name = serde_utils::empty_string_to_none(form.name).map(|mut name| {
    text_utils::truncate_utf8(&mut name, MAX_AUTHOR_LENGTH);
    text_utils::escape_html(name.trim())
  });

  if app_state.check_rate_limit() {
    return Err(Error::TooManyRequests);
  }

  let mut conn = helpers::db_conn(&app_state)?;
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let existing = db::site_content::subscriber_by_email(&tx, &email)
    .map_err(map_db_error)?;
  let id = match existing {
    Some(subscriber) => {
      db::site_content::reactivate_subscriber(&tx, subscriber.id, name.as_deref())
        .map_err(map_db_error)?;
      subscriber.id
    },
    None => {
      db::site_content::insert_subscriber(
        &tx,
        &email,
        name.as_deref(),
        &token_utils::generate_token()
      ).map_err(map_db_error)?
    }
  };
  tx.commit()?;
  info!("Newsletter subscription for subscriber {}", id);
  Ok(HttpResponse::Ok().json(JsonStatus::success("Subscribed to the newsletter")))
}

pub async fn unsubscribe(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>
) -> Result<HttpResponse, Error> {
  let token = path.into_inner().0;
  let conn = helpers::db_conn(&app_state)?;
  if db::site_content::deactivate_subscriber_by_token(&conn, &token)
    .map_err(map_db_error)? {
    Ok(HttpResponse::Ok().json(JsonStatus::success("Unsubscribed from the newsletter")))
  } else {
    Err(Error::NotFound("Unknown subscription".to_string()))
  }
}

pub async fn subscribers(
  _admin: AdminUser,
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let conn = helpers::db_conn(&app_state)?;
  let subscribers = db::site_content::active_subscribers(&conn)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(
    subscribers.into_iter()
      .map(|s| SubscriberDto::new(s, &app_state.site_info))
      .collect::<Vec<_>>()
  ))
}
