use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use log::{error, warn};
use crate::db::entities::{User, UserRole};
use crate::db::users;
use crate::utils::token_utils::hash_token;
use super::error::{map_db_error, Error};
use super::helpers;
use super::AppState;

/**
 * Extractors identifying the caller from the
 * "Authorization: Bearer <token>" header. Handlers that take
 * `Option<AuthenticatedUser>` accept guests too.
 */
pub struct AuthenticatedUser(pub User);

pub struct AdminUser(pub User);

fn bearer_token(req: &HttpRequest) -> Option<&str> {
  req.headers().get(header::AUTHORIZATION)?
    .to_str().ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|token| !token.is_empty())
}

// The connection is released before the handler runs.
fn user_from_request(req: &HttpRequest) -> Result<User, Error> {
  let token = bearer_token(req)
    .ok_or_else(|| Error::Unauthorized("Missing API token".to_string()))?;
  let app_state = req.app_data::<web::Data<AppState>>()
    .ok_or_else(|| {
      error!("AppState is missing from the app data");
      Error::InternalServerError("No app state".to_string())
    })?;
  let conn = helpers::db_conn(app_state)?;
  users::user_by_token_hash(&conn, &hash_token(token))
    .map_err(map_db_error)?
    .ok_or_else(|| {
      warn!("Rejected an unknown API token on {}", req.path());
      Error::Unauthorized("Invalid API token".to_string())
    })
}

impl FromRequest for AuthenticatedUser {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(user_from_request(req).map(AuthenticatedUser))
  }
}

impl FromRequest for AdminUser {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(user_from_request(req).and_then(|user| match user.role {
      UserRole::Admin => Ok(AdminUser(user)),
      _ => Err(Error::Forbidden("Admin role required".to_string()))
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn bearer_token_parsing() {
    let req = TestRequest::default()
      .insert_header(("authorization", "Bearer abc123"))
      .to_http_request();
    assert_eq!(bearer_token(&req), Some("abc123"));
    let req = TestRequest::default()
      .insert_header(("authorization", "Basic abc123"))
      .to_http_request();
    assert_eq!(bearer_token(&req), None);
    let req = TestRequest::default()
      .insert_header(("authorization", "Bearer   "))
      .to_http_request();
    assert_eq!(bearer_token(&req), None);
    assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
  }
}
