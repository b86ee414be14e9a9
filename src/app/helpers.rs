use actix_web::{web, HttpRequest};
use std::net::IpAddr;
use std::str::FromStr;
use regex::Regex;
use lazy_static::lazy_static;
use log::error;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use crate::config::SiteInfo;
use crate::stats::{BasePageView, StatsService};
use super::error::Error;
use super::AppState;

pub type Conn = PooledConnection<SqliteConnectionManager>;

pub fn db_conn(app_state: &web::Data<AppState>) -> Result<Conn, Error> {
  app_state.pool.get().map_err(Error::from)
}

// Empty string when the header is missing or isn't valid
// visible ASCII.
pub fn header_value(req: &HttpRequest, name: &str) -> String {
  req.headers().get(name)
    .and_then(|h| h.to_str().ok())
    .map(String::from)
    .unwrap_or_default()
}

pub fn real_ip_addr(req: &HttpRequest) -> Option<IpAddr> {
  // What actix gives us may or may not have a port part.
  lazy_static! {
    static ref PORT_REGEX: Regex = Regex::new(
      r"^\[?([^\]]+?)\]?:\d+$"
    ).unwrap();
  }

  let info = req.connection_info();
  let ip = info.realip_remote_addr()?;
  IpAddr::from_str(ip).ok()
    .or_else(|| IpAddr::from_str(&PORT_REGEX.replace(ip, "$1")).ok())
}

pub fn post_path(site_info: &SiteInfo, slug: &str) -> String {
  format!("/{}/{}", site_info.posts_root, slug)
}

pub fn post_url(site_info: &SiteInfo, slug: &str) -> String {
  format!("{}{}", site_info.root, post_path(site_info, slug))
}

// Leaves URLs that already have a scheme alone.
pub fn absolute_url(root: &str, url: String) -> String {
  if url.contains("://") {
    url
  } else if url.starts_with('/') {
    format!("{}{}", root, url)
  } else {
    format!("{}/{}", root, url)
  }
}

// A dead stats thread is logged, the request still goes
// through.
pub fn record_page_view(
  stats_service: &StatsService,
  post_id: i64,
  req: &HttpRequest
) {
  let referrer = Some(header_value(req, "referer"))
    .filter(|r| !r.is_empty());
  let view = BasePageView {
    post_id: Some(post_id),
    path: req.path().to_string(),
    client_ip: real_ip_addr(req),
    user_agent: header_value(req, "user-agent"),
    referrer
  };
  if let Err(e) = stats_service.insert_page_view(view) {
    error!("Could not save page view - {}", e);
  }
}

// Pagination params coming from query strings.
pub fn page_bounds(start: Option<usize>, max: Option<usize>, default_max: usize, limit: usize) -> (usize, usize) {
  let max = max.unwrap_or(default_max).clamp(1, limit);
  (start.unwrap_or_default(), max)
}
