/*
 * Comment threads: building reply trees out of the flat
 * comment rows, and the write operations (posting and
 * moderating) that keep post ratings in sync.
 */

pub mod tree;
pub mod service;

pub use tree::{build_tree, CommentNode};
pub use service::{
  moderate_comment,
  remove_comment,
  submit_comment,
  CommentAuthor,
  CommentError,
  CommentSubmission
};
