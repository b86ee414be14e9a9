use actix_web::{web, HttpResponse, Result};
use chrono::{Duration, Utc};
use serde::Deserialize;
use crate::db;
use crate::db::analytics::AdEvent;
use crate::utils::time_utils;
use super::super::auth::AdminUser;
use super::super::dtos::*;
use super::super::error::{map_db_error, Error};
use super::super::helpers;
use super::super::AppState;

const DEFAULT_ANALYTICS_DAYS: u32 = 30;
const MAX_ANALYTICS_DAYS: u32 = 365;
const TOP_POSTS_COUNT: usize = 10;
const MAX_SLOT_LENGTH: usize = 50;

#[derive(Deserialize)]
pub struct AdEventForm {
  pub slot: String,
  pub event: AdEvent
}

#[derive(Deserialize)]
pub struct AnalyticsQuery {
  pub days: Option<u32>
}

#[derive(Deserialize)]
pub struct AdSenseQuery {
  pub from: Option<String>,
  pub to: Option<String>
}

#[derive(Deserialize)]
pub struct EarningsForm {
  pub day: String,
  pub slot: String,
  pub earnings: f64
}

// Slots are ad unit names picked by the frontend.
fn valid_slot(slot: &str) -> Result<String, Error> {
  let slot = slot.trim();
  if slot.is_empty()
    || slot.chars().count() > MAX_SLOT_LENGTH
    || !slot.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
    return Err(Error::BadRequest("Invalid ad slot".to_string()));
  }
  Ok(slot.to_string())
}

fn valid_day(day: &str) -> Result<String, Error> {
  time_utils::parse_day(day.trim())
    .map(|d| d.format("%Y-%m-%d").to_string())
    .ok_or_else(|| Error::BadRequest(format!("Invalid day: {}", day)))
}

pub async fn ad_event(
  app_state: web::Data<AppState>,
  form: web::Json<AdEventForm>
) -> Result<HttpResponse, Error> {
  let slot = valid_slot(&form.slot)?;
  let conn = helpers::db_conn(&app_state)?;
  db::analytics::record_ad_event(&conn, &time_utils::current_day(), &slot, form.event)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(JsonStatus::success("Event recorded")))
}

pub async fn analytics(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  query: web::Query<AnalyticsQuery>
) -> Result<HttpResponse, Error> {
  let days = query.days
    .unwrap_or(DEFAULT_ANALYTICS_DAYS)
    .clamp(1, MAX_ANALYTICS_DAYS);
  // Today counts as one of the days.
  let since = time_utils::days_ago_timestamp(days - 1);
  let conn = helpers::db_conn(&app_state)?;
  let total_views = db::analytics::count_page_views_since(&conn, since)
    .map_err(map_db_error)?;
  let unique_visitors = db::analytics::count_unique_visitors_since(&conn, since)
    .map_err(map_db_error)?;
  let views_per_day = db::analytics::page_views_per_day(&conn, since)
    .map_err(map_db_error)?
    .into_iter()
    .map(|(day, views)| DayViewsDto { day, views })
    .collect();
  let top_posts = db::analytics::top_posts_since(&conn, since, TOP_POSTS_COUNT)
    .map_err(map_db_error)?
    .into_iter()
    .map(|(id, title, slug, views)| TopPostDto { id, title, slug, views })
    .collect();
  Ok(HttpResponse::Ok().json(AnalyticsDto {
    days,
    total_views,
    unique_visitors,
    views_per_day,
    top_posts
  }))
}

// Defaults to the last 30 days, both bounds included.
pub async fn adsense(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  query: web::Query<AdSenseQuery>
) -> Result<HttpResponse, Error> {
  let today = Utc::now().date_naive();
  let to = match &query.to {
    Some(to) => valid_day(to)?,
    None => today.format("%Y-%m-%d").to_string()
  };
  let from = match &query.from {
    Some(from) => valid_day(from)?,
    None => (today - Duration::days(i64::from(DEFAULT_ANALYTICS_DAYS) - 1))
      .format("%Y-%m-%d")
      .to_string()
  };
  if from > to {
    return Err(Error::BadRequest("Start day is after end day".to_string()));
  }
  let conn = helpers::db_conn(&app_state)?;
  let stats = db::analytics::adsense_stats_between(&conn, &from, &to)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(AdSenseReportDto::new(from, to, stats)))
}

pub async fn set_ad_earnings(
  _admin: AdminUser,
  app_state: web::Data<AppState>,
  form: web::Json<EarningsForm>
) -> Result<HttpResponse, Error> {
  let day = valid_day(&form.day)?;
  let slot = valid_slot(&form.slot)?;
  if !form.earnings.is_finite() || form.earnings < 0.0 {
    return Err(Error::BadRequest("Earnings must be a positive amount".to_string()));
  }
  let conn = helpers::db_conn(&app_state)?;
  db::analytics::set_ad_earnings(&conn, &day, &slot, form.earnings)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(JsonStatus::success("Earnings saved")))
}
