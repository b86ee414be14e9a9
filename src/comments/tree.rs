use std::collections::{HashMap, HashSet};
use crate::db::entities::Comment;

// A comment with its replies, recursively.
#[derive(Debug, Clone)]
pub struct CommentNode {
  pub comment: Comment,
  pub replies: Vec<CommentNode>
}

impl CommentNode {

  pub fn descendant_count(&self) -> usize {
    self.replies.iter().map(|r| 1 + r.descendant_count()).sum()
  }

  // Every descendant, depth first, in display order.
  pub fn into_flat_replies(self) -> Vec<Comment> {
    let mut flat = Vec::with_capacity(self.descendant_count());
    flatten_into(self.replies, &mut flat);
    flat
  }

}

fn flatten_into(nodes: Vec<CommentNode>, flat: &mut Vec<Comment>) {
  for CommentNode { comment, replies } in nodes {
    flat.push(comment);
    flatten_into(replies, flat);
  }
}

/**
 * Turns a flat list of comments into reply trees.
 *
 * Comments whose parent is in the list become replies of
 * that parent, keeping the input order. Everything else is
 * a root: no parent, a parent that isn't in the list anymore
 * (deleted, or not approved), or a comment pointing at
 * itself. Roots are sorted newest first, the higher id
 * first on equal timestamps.
 */
pub fn build_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
  let ids: HashSet<i64> = comments.iter().map(|c| c.id).collect();
  let mut children: HashMap<i64, Vec<Comment>> = HashMap::new();
  let mut roots: Vec<Comment> = Vec::new();

  for comment in comments {
    match comment.parent_id {
      Some(parent_id) if parent_id != comment.id && ids.contains(&parent_id) => {
        children.entry(parent_id).or_default().push(comment);
      },
      _ => roots.push(comment)
    }
  }

  roots.sort_by(|a, b| {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
  });
  roots.into_iter()
    .map(|root| attach_replies(root, &mut children))
    .collect()
}

// Removing the children from the map as they're attached
// means each comment is placed once, and reply cycles that
// never reach a root are simply left out.
fn attach_replies(
  comment: Comment,
  children: &mut HashMap<i64, Vec<Comment>>
) -> CommentNode {
  let replies = children.remove(&comment.id)
    .unwrap_or_default()
    .into_iter()
    .map(|reply| attach_replies(reply, children))
    .collect();
  CommentNode { comment, replies }
}
