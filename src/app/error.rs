use actix_web::{
  error::ResponseError,
  http::StatusCode,
  HttpResponse
};
use derive_more::Display;
use log::error;
use crate::comments::CommentError;
use super::dtos::JsonStatus;

// Internal details (the String in the 500 variants) are only
// logged, they never make it into the response body.
#[derive(Debug, Display)]
pub enum Error {
  #[display(fmt = "Internal Server Error")]
  InternalServerError(String),
  #[display(fmt = "Database Error")]
  DatabaseError(String),
  #[display(fmt = "Forbidden: {}", _0)]
  Forbidden(String),
  #[display(fmt = "Not Found: {}", _0)]
  NotFound(String),
  #[display(fmt = "Bad Request: {}", _0)]
  BadRequest(String),
  #[display(fmt = "Unauthorized: {}", _0)]
  Unauthorized(String),
  #[display(fmt = "Conflict: {}", _0)]
  Conflict(String),
  #[display(fmt = "Too Many Requests")]
  TooManyRequests
}

impl ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self {
      Error::InternalServerError(_) | Error::DatabaseError(_) =>
        StatusCode::INTERNAL_SERVER_ERROR,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::TooManyRequests => StatusCode::TOO_MANY_REQUESTS
    }
  }

  fn error_response(&self) -> HttpResponse {
    HttpResponse::build(self.status_code())
      .json(JsonStatus::failure(&self.to_string()))
  }
}

// Most handlers just do .map_err(map_db_error)?
pub fn map_db_error(e: eyre::Report) -> Error {
  error!("Database error: {:?}", e);
  Error::DatabaseError(e.to_string())
}

impl From<r2d2::Error> for Error {
  fn from(e: r2d2::Error) -> Self {
    error!("Could not get a database connection - {}", e);
    Error::DatabaseError(e.to_string())
  }
}

// Transactions opened in handlers.
impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    map_db_error(e.into())
  }
}

impl From<CommentError> for Error {
  fn from(e: CommentError) -> Self {
    match e {
      CommentError::NotFound => Error::NotFound(e.to_string()),
      CommentError::InvalidParent => Error::BadRequest(e.to_string()),
      CommentError::Database(report) => map_db_error(report)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;

  #[actix_web::test]
  async fn errors_are_json_failures() {
    let response = Error::NotFound("No posts found".to_string()).error_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body()).await.unwrap();
    let status: JsonStatus = serde_json::from_slice(&body).unwrap();
    assert!(!status.success);
    assert_eq!(status.message, "Not Found: No posts found");
  }

  #[actix_web::test]
  async fn internal_details_stay_out_of_the_body() {
    let response = Error::DatabaseError("disk I/O error at /var/db".to_string())
      .error_response();
    let body = to_bytes(response.into_body()).await.unwrap();
    let status: JsonStatus = serde_json::from_slice(&body).unwrap();
    assert_eq!(status.message, "Database Error");
  }

  #[test]
  fn comment_errors_map_to_statuses() {
    assert_eq!(
      Error::from(CommentError::InvalidParent).status_code(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      Error::from(CommentError::NotFound).status_code(),
      StatusCode::NOT_FOUND
    );
  }
}
