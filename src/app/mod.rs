use actix_web::{http::header, middleware, web, App, HttpServer};
use actix_cors::Cors;
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, error, info};
use handlebars::Handlebars;
use rate_limiter::BasicRateLimiter;
use std::sync::Mutex;
// "crate" is needed because of the config crate we
// depend on.
use crate::config::{Config, SiteInfo};
use crate::db::{self, Pool};
use crate::stats::StatsService;
use error::Error;
mod handlers;
mod dtos;
mod error;
mod helpers;
mod rate_limiter;
mod guards;
mod auth;

// IP addresses allowed to call the maintenance endpoints
// (feeds, scheduled publishing, rating rebuild).
pub const ALLOWED_IP_ADDRESSES: [&'static str; 2] =
  ["127.0.0.1", "::1"];

pub struct AppState {
  pub pool: Pool,
  pub stats_service: StatsService,
  pub rate_limiter: Mutex<BasicRateLimiter>,
  pub site_info: SiteInfo
}

impl AppState {

  // True when the request has to be refused.
  pub fn check_rate_limit(&self) -> bool {
    match self.rate_limiter.lock() {
      Ok(mut rl) => rl.update(),
      Err(e) => {
        error!("Rate limiter mutex is poisoned - {}", e);
        false
      }
    }
  }

}

pub async fn run() -> Result<()> {
  let config = Config::from_env()
    .context("Configuration (environment or .env file) is missing")?;
  debug!("Current config: {:?}", config);
  let pool = db::open_pool(&config.db_path)?;

  let stats_service = StatsService::open(&pool, config.message_queue_size)?;

  // Feed templates, crash right away if they're missing.
  let mut handlebars = Handlebars::new();
  handlebars
    .register_templates_directory(".xhtml", &config.template_dir)
    .context("Templates directory might be missing or not accessible")?;
  let handlebars_ref = web::Data::new(handlebars);

  // config gets moved into SiteInfo below.
  let bind_address = config.bind_address.clone();
  let cors_origin = config.cors_origin.clone();

  let app_state = web::Data::new(
    AppState {
      pool,
      stats_service,
      rate_limiter: Mutex::new(
        BasicRateLimiter::new(
          config.rl_max_requests,
          config.rl_max_requests_time,
          config.rl_block_duration
        )
      ),
      site_info: config.into()
    }
  );

  info!("Starting server on {}", bind_address);
  HttpServer::new(move || {
    let cors = Cors::default()
      .allowed_origin(&cors_origin)
      .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
      .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
      .max_age(3600);
    App::new()
      .app_data(app_state.clone())
      .app_data(handlebars_ref.clone())
      .configure(extractors_config)
      .wrap(cors)
      .wrap(middleware::Logger::default())
      .configure(base_endpoints_config)
      .default_service(web::route().to(handlers::not_found))
  })
  .bind(bind_address)?
  .run()
  .await
  .context("Start Actix web server")
}

// Extractor failures answer with the same JSON body as
// every other error.
fn extractors_config(cfg: &mut web::ServiceConfig) {
  cfg.app_data(web::PathConfig::default().error_handler(|_, _| {
      Error::BadRequest("Invalid path arguments".to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|_, _| {
      Error::BadRequest("Invalid query string arguments".to_string()).into()
    }))
    .app_data(web::JsonConfig::default().error_handler(|e, _| {
      Error::BadRequest(format!("Invalid JSON body - {}", e)).into()
    }));
}

fn base_endpoints_config(cfg: &mut web::ServiceConfig) {
  // Protected endpoints respond with a 404 to other
  // clients.
  let ip_guard = guards::IPRestrictedGuard::new(&ALLOWED_IP_ADDRESSES);

  cfg.route("/", web::get().to(handlers::index))
    .route("/posts", web::get().to(handlers::posts))
    .route("/posts/{slug}", web::get().to(handlers::post))
    .route("/posts/{slug}/comments", web::get().to(handlers::post_comments))
    .route("/posts/{slug}/comments", web::post().to(handlers::post_comment))
    .route("/posts/{slug}/rating", web::post().to(handlers::rate_post))
    .route("/categories", web::get().to(handlers::categories))
    .route("/tags", web::get().to(handlers::tags))
    .route("/testimonials", web::get().to(handlers::testimonials))
    .route("/faqs", web::get().to(handlers::faqs))
    .route("/newsletter/subscribe", web::post().to(handlers::subscribe))
    .route("/newsletter/unsubscribe/{token}", web::get().to(handlers::unsubscribe))
    .route("/adsense/events", web::post().to(handlers::ad_event))
    .route("/notifications", web::get().to(handlers::notifications))
    .route("/notifications/unread-count", web::get().to(handlers::unread_count))
    .route("/notifications/read-all", web::post().to(handlers::mark_all_read))
    .route("/notifications/{id}/read", web::post().to(handlers::mark_read))
    .route("/rss", web::get().guard(ip_guard.clone()).to(handlers::rss))
    .route("/sitemap", web::get().guard(ip_guard.clone()).to(handlers::sitemap))
    .route("/publish-scheduled", web::get().guard(ip_guard.clone()).to(handlers::publish_scheduled))
    .route("/recompute-ratings", web::get().guard(ip_guard).to(handlers::recompute_ratings))
    .service(
      web::scope("/admin")
        .route("/posts", web::get().to(handlers::admin_posts))
        .route("/posts", web::post().to(handlers::create_post))
        .route("/posts/{id}", web::put().to(handlers::update_post))
        .route("/posts/{id}", web::delete().to(handlers::delete_post))
        .route("/comments", web::get().to(handlers::admin_comments))
        .route("/comments/{id}/status", web::put().to(handlers::moderate_comment))
        .route("/comments/{id}", web::delete().to(handlers::delete_comment))
        .route("/categories", web::post().to(handlers::create_category))
        .route("/categories/{id}", web::put().to(handlers::update_category))
        .route("/categories/{id}", web::delete().to(handlers::delete_category))
        .route("/tags", web::post().to(handlers::create_tag))
        .route("/tags/{id}", web::delete().to(handlers::delete_tag))
        .route("/notifications", web::post().to(handlers::send_notification))
        .route("/subscribers", web::get().to(handlers::subscribers))
        .route("/testimonials", web::post().to(handlers::create_testimonial))
        .route("/testimonials/{id}/approve", web::put().to(handlers::approve_testimonial))
        .route("/testimonials/{id}", web::delete().to(handlers::delete_testimonial))
        .route("/faqs", web::post().to(handlers::create_faq))
        .route("/faqs/{id}", web::put().to(handlers::update_faq))
        .route("/faqs/{id}", web::delete().to(handlers::delete_faq))
        .route("/analytics", web::get().to(handlers::analytics))
        .route("/adsense", web::get().to(handlers::adsense))
        .route("/adsense/earnings", web::put().to(handlers::set_ad_earnings))
    );
}

// Shared by the handler tests: the full router on top of an
// in-memory database.
#[cfg(test)]
pub mod test_support {
  use super::*;
  use actix_web::body::BoxBody;
  use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
  use rusqlite::Connection;
  use crate::db::entities::UserRole;
  use crate::db::users;
  use crate::utils::token_utils::hash_token;

  pub fn app_state(pool: &Pool) -> web::Data<AppState> {
    web::Data::new(AppState {
      pool: pool.clone(),
      stats_service: StatsService::open(pool, 10).unwrap(),
      rate_limiter: Mutex::new(BasicRateLimiter::new(100, 60, 60)),
      site_info: SiteInfo::for_tests()
    })
  }

  pub fn templates() -> web::Data<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars
      .register_template_string("rss", include_str!("../../templates/rss.xhtml"))
      .unwrap();
    handlebars
      .register_template_string("sitemap", include_str!("../../templates/sitemap.xhtml"))
      .unwrap();
    web::Data::new(handlebars)
  }

  pub fn app(
    state: web::Data<AppState>
  ) -> App<
    impl ServiceFactory<
      ServiceRequest,
      Config = (),
      Response = ServiceResponse<BoxBody>,
      Error = actix_web::Error,
      InitError = ()
    >
  > {
    App::new()
      .app_data(state)
      .app_data(templates())
      .configure(extractors_config)
      .configure(base_endpoints_config)
      .default_service(web::route().to(handlers::not_found))
  }

  // Returns the user id and the clear API token.
  pub fn user_with_token(conn: &Connection, name: &str, role: UserRole) -> (i64, String) {
    let token = format!("token-for-{}", name.to_lowercase());
    let id = users::insert_user(
      conn,
      name,
      &format!("{}@example.com", name.to_lowercase()),
      role,
      &hash_token(&token)
    ).unwrap();
    (id, token)
  }

  pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
  }
}
