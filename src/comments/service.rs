use rusqlite::{Connection, TransactionBehavior};
use derive_more::Display;
use eyre::Report;
use log::{debug, info};
use crate::db::entities::*;
use crate::db::{comments, notifications};
use crate::ratings;
use crate::utils::time_utils::current_timestamp;

#[derive(Debug, Display)]
pub enum CommentError {
  #[display(fmt = "Comment not found")]
  NotFound,
  #[display(fmt = "Parent comment does not belong to this post")]
  InvalidParent,
  #[display(fmt = "Database error: {}", _0)]
  Database(Report)
}

impl std::error::Error for CommentError {}

impl From<Report> for CommentError {
  fn from(e: Report) -> Self {
    CommentError::Database(e)
  }
}

impl From<rusqlite::Error> for CommentError {
  fn from(e: rusqlite::Error) -> Self {
    CommentError::Database(Report::new(e))
  }
}

#[derive(Debug)]
pub enum CommentAuthor {
  Guest { name: String, email: String },
  Member(User)
}

// Already validated and escaped input.
#[derive(Debug)]
pub struct CommentSubmission {
  pub parent_id: Option<i64>,
  pub author: CommentAuthor,
  pub content: String,
  pub rating: Option<i32>,
  pub client_ip: Option<String>,
  // Where notifications should point to, without the
  // comment anchor.
  pub post_link: String
}

/**
 * Save a new comment on a post.
 *
 * Guest comments wait in the moderation queue, comments from
 * registered users are approved right away, and their rating
 * counts immediately. The post author and the author of the
 * parent comment get notified.
 */
pub fn submit_comment(
  conn: &mut Connection,
  post: &Post,
  submission: CommentSubmission
) -> Result<Comment, CommentError> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let parent = match submission.parent_id {
    Some(parent_id) => match comments::comment_by_id(&tx, parent_id)? {
      Some(parent) if parent.post_id == post.id => Some(parent),
      _ => return Err(CommentError::InvalidParent)
    },
    None => None
  };

  let (user_id, author_name, author_email, status) = match submission.author {
    CommentAuthor::Guest { name, email } => (None, name, email, CommentStatus::Pending),
    CommentAuthor::Member(user) => (Some(user.id), user.name, user.email, CommentStatus::Approved)
  };

  let mut comment = Comment {
    id: -1,
    post_id: post.id,
    parent_id: parent.as_ref().map(|p| p.id),
    user_id,
    author_name,
    author_email,
    content: submission.content,
    status,
    rating: submission.rating,
    client_ip: submission.client_ip,
    created_at: current_timestamp()
  };
  comments::insert_comment(&tx, &mut comment)?;

  if comment.status == CommentStatus::Approved && comment.rating.is_some() {
    ratings::recompute_post_rating(&tx, post.id)?;
  }

  let link = format!("{}#comment-{}", submission.post_link, comment.id);
  if let Some(author_id) = post.author_id {
    if Some(author_id) != comment.user_id {
      notifications::insert_notification(&tx, &NewNotification {
        recipient_id: author_id,
        kind: NotificationKind::Info,
        title: format!("New comment on \"{}\"", post.title),
        message: format!("{} left a comment.", comment.author_name),
        link: Some(link.clone())
      })?;
    }
  }
  if let Some(parent_user) = parent.and_then(|p| p.user_id) {
    // The post author already got one.
    if Some(parent_user) != comment.user_id && Some(parent_user) != post.author_id {
      notifications::insert_notification(&tx, &NewNotification {
        recipient_id: parent_user,
        kind: NotificationKind::Info,
        title: "New reply to your comment".to_string(),
        message: format!("{} replied to you on \"{}\".", comment.author_name, post.title),
        link: Some(link)
      })?;
    }
  }

  tx.commit()?;
  debug!("Saved comment {} on post {}", comment.id, post.id);
  Ok(comment)
}

/**
 * Change the status of a comment. When a rated comment moves
 * in or out of "approved" the post rating is recomputed in the
 * same transaction.
 */
pub fn moderate_comment(
  conn: &mut Connection,
  id: i64,
  status: CommentStatus
) -> Result<Comment, CommentError> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let mut comment = comments::comment_by_id(&tx, id)?
    .ok_or(CommentError::NotFound)?;
  let previous = comment.status;
  if previous == status {
    return Ok(comment);
  }
  comments::set_comment_status(&tx, id, status)?;
  comment.status = status;

  let approval_changed = previous == CommentStatus::Approved
    || status == CommentStatus::Approved;
  if approval_changed && comment.rating.is_some() {
    ratings::recompute_post_rating(&tx, comment.post_id)?;
  }
  if status == CommentStatus::Approved {
    if let Some(user_id) = comment.user_id {
      notifications::insert_notification(&tx, &NewNotification {
        recipient_id: user_id,
        kind: NotificationKind::Success,
        title: "Comment approved".to_string(),
        message: "Your comment is now visible.".to_string(),
        link: None
      })?;
    }
  }

  tx.commit()?;
  info!("Comment {} moved from {} to {}", id, previous, status);
  Ok(comment)
}

pub fn remove_comment(conn: &mut Connection, id: i64) -> Result<(), CommentError> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let comment = comments::comment_by_id(&tx, id)?
    .ok_or(CommentError::NotFound)?;
  comments::delete_comment(&tx, id)?;
  if comment.status == CommentStatus::Approved && comment.rating.is_some() {
    ratings::recompute_post_rating(&tx, comment.post_id)?;
  }
  tx.commit()?;
  info!("Comment {} deleted", id);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{fixtures, memory_pool, posts};

  fn guest(content: &str, rating: Option<i32>, parent_id: Option<i64>) -> CommentSubmission {
    CommentSubmission {
      parent_id,
      author: CommentAuthor::Guest {
        name: "Guest".to_string(),
        email: "guest@example.com".to_string()
      },
      content: content.to_string(),
      rating,
      client_ip: Some("127.0.0.1".to_string()),
      post_link: "/posts/post".to_string()
    }
  }

  fn member(user: User, rating: Option<i32>, parent_id: Option<i64>) -> CommentSubmission {
    CommentSubmission {
      author: CommentAuthor::Member(user),
      ..guest("Member comment", rating, parent_id)
    }
  }

  #[test]
  fn guest_comments_are_pending_and_do_not_count() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let post_id = fixtures::post(&conn, "Post", PostStatus::Published, None);
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();
    let comment = submit_comment(&mut conn, &post, guest("Hi", Some(5), None)).unwrap();
    assert_eq!(comment.status, CommentStatus::Pending);
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();
    assert_eq!(post.rating_count, 0);
  }

  #[test]
  fn approving_a_rated_comment_updates_the_post() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let post_id = fixtures::post(&conn, "Post", PostStatus::Published, None);
    fixtures::comment(&conn, post_id, None, CommentStatus::Approved, Some(4), 1);
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();
    let comment = submit_comment(&mut conn, &post, guest("Hi", Some(5), None)).unwrap();

    moderate_comment(&mut conn, comment.id, CommentStatus::Approved).unwrap();
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();
    assert_eq!((post.rating, post.rating_count), (4.5, 2));

    // And back out again when it turns out to be spam:
    moderate_comment(&mut conn, comment.id, CommentStatus::Spam).unwrap();
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();
    assert_eq!((post.rating, post.rating_count), (4.0, 1));
  }

  #[test]
  fn member_comments_are_approved_and_notify_the_author() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let author = fixtures::user(&conn, "Ada", UserRole::Author);
    let reader = fixtures::user(&conn, "Bob", UserRole::Reader);
    let reader = crate::db::users::user_by_id(&conn, reader).unwrap().unwrap();
    let post_id = fixtures::post(&conn, "Post", PostStatus::Published, Some(author));
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();

    let comment = submit_comment(&mut conn, &post, member(reader, Some(3), None)).unwrap();
    assert_eq!(comment.status, CommentStatus::Approved);
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();
    assert_eq!((post.rating, post.rating_count), (3.0, 1));

    let inbox = notifications::notifications_for(&conn, author, false, 10).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(
      inbox[0].link.as_deref(),
      Some(format!("/posts/post#comment-{}", comment.id).as_str())
    );
  }

  #[test]
  fn replies_notify_the_parent_author() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let bob = fixtures::user(&conn, "Bob", UserRole::Reader);
    let bob = crate::db::users::user_by_id(&conn, bob).unwrap().unwrap();
    let post_id = fixtures::post(&conn, "Post", PostStatus::Published, None);
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();
    let parent = submit_comment(&mut conn, &post, member(bob.clone(), None, None)).unwrap();
    submit_comment(&mut conn, &post, guest("Reply", None, Some(parent.id))).unwrap();
    let inbox = notifications::notifications_for(&conn, bob.id, false, 10).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].title, "New reply to your comment");
  }

  #[test]
  fn parent_must_belong_to_the_same_post() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let first = fixtures::post(&conn, "First", PostStatus::Published, None);
    let second = fixtures::post(&conn, "Second", PostStatus::Published, None);
    let foreign = fixtures::comment(&conn, second, None, CommentStatus::Approved, None, 1);
    let post = posts::post_by_id(&conn, first).unwrap().unwrap();
    let result = submit_comment(&mut conn, &post, guest("Hi", None, Some(foreign)));
    assert!(matches!(result, Err(CommentError::InvalidParent)));
    let result = submit_comment(&mut conn, &post, guest("Hi", None, Some(12345)));
    assert!(matches!(result, Err(CommentError::InvalidParent)));
  }

  #[test]
  fn removing_an_approved_rated_comment_recomputes() {
    let pool = memory_pool();
    let mut conn = pool.get().unwrap();
    let post_id = fixtures::post(&conn, "Post", PostStatus::Published, None);
    let id = fixtures::comment(&conn, post_id, None, CommentStatus::Pending, Some(2), 1);
    moderate_comment(&mut conn, id, CommentStatus::Approved).unwrap();
    remove_comment(&mut conn, id).unwrap();
    let post = posts::post_by_id(&conn, post_id).unwrap().unwrap();
    assert_eq!((post.rating, post.rating_count), (0.0, 0));
    assert!(matches!(remove_comment(&mut conn, id), Err(CommentError::NotFound)));
  }
}
