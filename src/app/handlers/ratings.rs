use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use crate::ratings;
use super::super::auth::AuthenticatedUser;
use super::super::dtos::RatingResultDto;
use super::super::error::{map_db_error, Error};
use super::super::helpers;
use super::super::AppState;
use super::published_post;

#[derive(Deserialize)]
pub struct RatingForm {
  pub rating: i32
}

// One rating per user and post, rating again overwrites.
pub async fn rate_post(
  user: AuthenticatedUser,
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  form: web::Json<RatingForm>
) -> Result<HttpResponse, Error> {
  let slug = path.into_inner().0;
  if !ratings::is_valid_rating(form.rating) {
    return Err(Error::BadRequest(format!(
      "Rating must be between {} and {}",
      ratings::MIN_RATING,
      ratings::MAX_RATING
    )));
  }
  let mut conn = helpers::db_conn(&app_state)?;
  let post = published_post(&conn, &slug)?;
  let (rating, summary) = ratings::submit_user_rating(&mut conn, user.0.id, post.id, form.rating)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(RatingResultDto::new(&rating, summary)))
}

#[cfg(test)]
mod tests {
  use actix_web::{http::StatusCode, test};
  use serde_json::json;
  use crate::app::dtos::RatingResultDto;
  use crate::app::test_support::{self, bearer, user_with_token};
  use crate::db::{fixtures, memory_pool};
  use crate::db::entities::*;

  #[actix_web::test]
  async fn rating_twice_overwrites() {
    let pool = memory_pool();
    let token = {
      let conn = pool.get().unwrap();
      let post = fixtures::post(&conn, "Post", PostStatus::Published, None);
      fixtures::comment(&conn, post, None, CommentStatus::Approved, Some(2), 1);
      user_with_token(&conn, "Bob", UserRole::Reader).1
    };
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;

    for (value, expected) in [(5, 3.5), (3, 2.5)] {
      let req = test::TestRequest::post()
        .uri("/posts/post/rating")
        .insert_header(bearer(&token))
        .set_json(json!({ "rating": value }))
        .to_request();
      let result: RatingResultDto = test::call_and_read_body_json(&app, req).await;
      assert_eq!(result.rating, value);
      assert_eq!(result.post_rating, expected);
      assert_eq!(result.post_rating_count, 2);
    }
  }

  #[actix_web::test]
  async fn rating_needs_a_user_and_a_valid_value() {
    let pool = memory_pool();
    let token = {
      let conn = pool.get().unwrap();
      fixtures::post(&conn, "Post", PostStatus::Published, None);
      user_with_token(&conn, "Bob", UserRole::Reader).1
    };
    let app = test::init_service(test_support::app(test_support::app_state(&pool))).await;

    let req = test::TestRequest::post()
      .uri("/posts/post/rating")
      .set_json(json!({ "rating": 4 }))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
      .uri("/posts/post/rating")
      .insert_header(bearer(&token))
      .set_json(json!({ "rating": 0 }))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
  }
}
